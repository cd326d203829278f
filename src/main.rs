use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use pinboard::api::{ApiClient, ApiError, ErrorContext};
use pinboard::config::PinboardConfig;
use pinboard::core::contact::{ContactDraft, ContactId};
use pinboard::core::task::{CardId, Category, NewTask, Priority, TaskStatus};
use pinboard::core::user::{UserId, assignable_users};
use pinboard::flows::FlowError;
use pinboard::flows::auth::{self, SignUp};
use pinboard::flows::board::BoardController;
use pinboard::flows::contacts::ContactBook;
use pinboard::session::keepalive::{TokenCheck, spawn_keepalive, validate_token};
use pinboard::session::{Persistence, Session};
use pinboard::store::Store;

#[derive(Parser)]
#[command(name = "pinboard")]
#[command(version, about = "Kanban board and contact book client")]
struct Cli {
    /// Log debug output to the journal
    #[arg(long, global = true)]
    debug: bool,

    /// Backend URL, overrides the config file and PINBOARD_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PINBOARD_PASSWORD", hide_env_values = true)]
        password: String,
        /// Keep the token in the keyring across sessions
        #[arg(long)]
        remember: bool,
    },
    /// Start a guest session
    Guest,
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, env = "PINBOARD_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    Logout,
    /// Show the board
    Board {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Move a card to another column
    Move {
        card_id: CardId,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Check a card's subtask, counted from 1 as listed
    Check {
        card_id: CardId,
        index: usize,
        #[arg(long)]
        uncheck: bool,
    },
    AddTask {
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = parse_category)]
        category: Category,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        /// User id to assign; repeatable
        #[arg(long = "assign")]
        assign: Vec<UserId>,
        /// Subtask text; repeatable
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
    DeleteTask {
        card_id: CardId,
    },
    /// List contacts
    Contacts {
        /// Show one contact's details
        #[arg(long)]
        show: Option<ContactId>,
    },
    AddContact {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Edit a contact; omitted fields keep their value
    EditContact {
        id: ContactId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    DeleteContact {
        id: ContactId,
    },
    /// Show or edit your own profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Delete your account
        #[arg(long)]
        delete: bool,
    },
    /// List users that can be assigned to tasks
    Users,
    /// Check that the stored token is still accepted
    Validate,
    /// Keep the session alive and redraw the board periodically
    Watch {
        #[arg(long, default_value = "30")]
        refresh_secs: u64,
    },
}

impl Commands {
    fn error_context(&self) -> ErrorContext {
        match self {
            Self::Register { .. } | Self::Profile { .. } | Self::Login { .. } => ErrorContext::User,
            Self::AddContact { .. } | Self::EditContact { .. } | Self::DeleteContact { .. } => {
                ErrorContext::Contact
            }
            _ => ErrorContext::General,
        }
    }
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_key(s)
        .ok_or_else(|| "expected one of toDo, inProgress, awaitFeedback, done".to_string())
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_label(s).ok_or_else(|| {
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        format!("expected one of: {}", labels.join(", "))
    })
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::from_key(s).ok_or_else(|| "expected low, medium or urgent".to_string())
}

/// Journal logger: pinboard targets at info (debug when enabled), everything else at warn.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("pinboard") {
                let max = if pinboard::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    pinboard::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("pinboard".to_string()),
        Err(e) => {
            eprintln!("journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so pinboard debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = PinboardConfig::load(&PinboardConfig::default_path()).with_env_override();
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    init_logging(cli.debug || config.debug_logging);

    let context = cli.command.error_context();
    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Command failed: {}", e);
            if e.is_auth_failure() {
                eprintln!("Not logged in. Run `pinboard login` or `pinboard guest` first.");
            } else {
                for line in e.user_messages(context) {
                    eprintln!("{}", line);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &PinboardConfig) -> Result<(), FlowError> {
    let session = Session::restore(Persistence {
        session_file: Some(config.session_path()),
        keyring_server: Some(config.keyring_server()),
    })
    .await?;
    let api = ApiClient::new(&config.base_url, session)?;
    let store = Arc::new(Store::new());

    match command {
        Commands::Login {
            email,
            password,
            remember,
        } => {
            auth::login(&api, &email, &password, remember).await?;
            println!("Logged in as {}", email);
        }
        Commands::Guest => {
            auth::guest_login(&api).await?;
            println!("Guest session started");
        }
        Commands::Register {
            username,
            email,
            phone,
            password,
            confirm_password,
        } => {
            let form = SignUp {
                username,
                email,
                phone,
                password,
                confirm_password,
            };
            auth::register(&api, &form).await?;
            println!("Registered. You can log in now.");
        }
        Commands::Logout => {
            auth::logout(&api).await?;
            println!("Logged out");
        }
        Commands::Board { search } => {
            let board = BoardController::new(api, store);
            board.init().await?;
            print!("{}", board.view(search.as_deref()));
        }
        Commands::Move { card_id, status } => {
            let board = BoardController::new(api, store);
            board.move_task(card_id, status).await?;
            print!("{}", board.view(None));
        }
        Commands::Check {
            card_id,
            index,
            uncheck,
        } => {
            let board = BoardController::new(api, store);
            board.init().await?;
            let index = index
                .checked_sub(1)
                .ok_or_else(|| FlowError::Invalid("Subtasks are counted from 1".to_string()))?;
            board.set_subtask_checked(card_id, index, !uncheck).await?;
            print!("{}", board.view(None));
        }
        Commands::AddTask {
            title,
            category,
            description,
            priority,
            date,
            assign,
            subtasks,
        } => {
            let mut task = NewTask::new(title, category);
            task.description = description;
            task.priority = priority;
            task.date = date;
            task.user_ids = assign;
            for text in subtasks {
                task = task.with_subtask(text);
            }
            let board = BoardController::new(api, store);
            board.create_task(&task).await?;
            print!("{}", board.view(None));
        }
        Commands::DeleteTask { card_id } => {
            let board = BoardController::new(api, store);
            board.delete_task(card_id).await?;
            println!("Deleted task {}", card_id);
        }
        Commands::Contacts { show } => {
            let mut book = ContactBook::new(api, store);
            book.init().await?;
            if let Some(id) = show {
                book.select(id);
            }
            print!("{}", book.view());
        }
        Commands::AddContact { name, email, phone } => {
            let mut book = ContactBook::new(api, store);
            book.init().await?;
            let created = book.create(&ContactDraft { name, email, phone }).await?;
            println!("Created contact {} (#{})", created.name, created.id);
        }
        Commands::EditContact {
            id,
            name,
            email,
            phone,
        } => {
            let book = ContactBook::new(api, store);
            book.init().await?;
            let existing = book
                .find(id)
                .ok_or_else(|| FlowError::NotFound(format!("contact {}", id)))?;
            let draft = ContactDraft {
                name: name.unwrap_or(existing.name),
                email: email.unwrap_or(existing.email),
                phone: phone.unwrap_or(existing.phone),
            };
            let updated = book.edit(id, &draft).await?;
            println!("Updated contact {} (#{})", updated.name, updated.id);
        }
        Commands::DeleteContact { id } => {
            let mut book = ContactBook::new(api, store);
            book.init().await?;
            if book.delete(id).await? {
                println!("Deleted contact {}", id);
            } else {
                println!("No contact {}", id);
            }
        }
        Commands::Profile {
            name,
            email,
            phone,
            delete,
        } => {
            let book = ContactBook::new(api, store);
            book.init().await?;
            let profile = book
                .profile()
                .ok_or_else(|| FlowError::NotFound("profile".to_string()))?;
            if delete {
                book.delete_profile(profile.id).await?;
                println!("Account deleted");
            } else if name.is_some() || email.is_some() || phone.is_some() {
                let draft = ContactDraft {
                    name: name.unwrap_or(profile.username),
                    email: email.unwrap_or(profile.email),
                    phone: phone.unwrap_or(profile.phone),
                };
                let updated = book.edit_profile(&draft).await?;
                println!("{} <{}> {}", updated.username, updated.email, updated.phone);
            } else {
                println!(
                    "[{}] {} <{}> {}",
                    profile.emblem, profile.username, profile.email, profile.phone
                );
            }
        }
        Commands::Users => {
            let users = store.reload_users(&api).await?;
            for user in assignable_users(&users) {
                println!("#{} [{}] {}", user.id, user.emblem, user.username);
            }
        }
        Commands::Validate => match validate_token(&api).await? {
            TokenCheck::Valid => println!("Token is valid"),
            TokenCheck::Unexpected(status) => {
                println!("Server answered {}; keeping session", status)
            }
            other => println!("Logged out ({:?})", other),
        },
        Commands::Watch { refresh_secs } => watch_board(api, store, config, refresh_secs).await?,
    }
    Ok(())
}

async fn watch_board(
    api: ApiClient,
    store: Arc<Store>,
    config: &PinboardConfig,
    refresh_secs: u64,
) -> Result<(), FlowError> {
    let check = validate_token(&api).await?;
    if matches!(
        check,
        TokenCheck::NoToken | TokenCheck::Rejected | TokenCheck::Unreachable
    ) {
        return Err(ApiError::Unauthenticated.into());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let keepalive = spawn_keepalive(api.clone(), config.ping_interval(), shutdown_rx);

    let board = BoardController::new(api, store);
    board.init().await?;
    print!("{}", board.view(None));

    let mut refresh = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
    refresh.tick().await;
    let result = loop {
        tokio::select! {
            _ = refresh.tick() => {
                if let Err(e) = board.init().await {
                    break Err(e);
                }
                println!();
                print!("{}", board.view(None));
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    let _ = shutdown_tx.send(true);
    if let Err(e) = keepalive.await {
        log::warn!("Keep-alive task ended abnormally: {}", e);
    }
    result
}
