//! View models built from store snapshots, plus their plain-text rendering
//! for the terminal.

use std::fmt;

use crate::core::board::{Column, columns, search};
use crate::core::contact::{Contact, ContactId};
use crate::core::task::{CardId, Category, Priority, Task, TaskStatus};
use crate::core::user::Profile;

/// Emblems shown on a card before the rest collapse into a counter.
pub const MAX_CARD_EMBLEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub card_id: CardId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    /// `(percent, "k/n Subtasks")`, absent without subtasks.
    pub progress: Option<(u8, String)>,
    pub emblems: Vec<String>,
    pub extra_assignees: usize,
}

impl CardView {
    pub fn from_task(task: &Task) -> Self {
        let assignees: Vec<_> = task.assignees().collect();
        Self {
            card_id: task.card_id,
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category,
            priority: task.priority,
            progress: task.progress().map(|p| (p.percent(), p.label())),
            emblems: assignees
                .iter()
                .take(MAX_CARD_EMBLEMS)
                .map(|u| u.emblem.clone())
                .collect(),
            extra_assignees: assignees.len().saturating_sub(MAX_CARD_EMBLEMS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub status: TaskStatus,
    pub title: &'static str,
    pub cards: Vec<CardView>,
}

impl ColumnView {
    fn from_column(column: &Column<'_>) -> Self {
        Self {
            status: column.status,
            title: column.status.title(),
            cards: column.tasks.iter().map(|t| CardView::from_task(t)).collect(),
        }
    }

    pub fn empty_text(&self) -> String {
        format!("No tasks {}", self.title)
    }
}

/// The four columns in board order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    pub fn build(tasks: &[Task], query: Option<&str>) -> Self {
        let cols = match query {
            Some(q) => search(tasks, q),
            None => columns(tasks),
        };
        Self {
            columns: cols.iter().map(ColumnView::from_column).collect(),
        }
    }

    pub fn column(&self, status: TaskStatus) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.status == status)
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  #{} [{}] {} ({})",
            self.card_id,
            self.category,
            self.title,
            self.priority.as_key()
        )?;
        if !self.description.is_empty() {
            write!(f, "\n      {}", self.description)?;
        }
        if let Some((percent, label)) = &self.progress {
            write!(f, "\n      {} ({}%)", label, percent)?;
        }
        if !self.emblems.is_empty() {
            write!(f, "\n      {}", self.emblems.join(" "))?;
            if self.extra_assignees > 0 {
                write!(f, " +{}", self.extra_assignees)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "== {} ({}) ==", column.title, column.cards.len())?;
            if column.cards.is_empty() {
                writeln!(f, "  {}", column.empty_text())?;
            }
            for card in &column.cards {
                writeln!(f, "{}", card)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub emblem: String,
    pub selected: bool,
}

/// Contacts sharing one letter header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSection {
    pub letter: String,
    pub rows: Vec<ContactRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactListView {
    pub me: Option<ContactRow>,
    pub sections: Vec<ContactSection>,
    pub details: Option<Contact>,
}

impl ContactListView {
    /// Expects `contacts` already sorted, as the store keeps them.
    pub fn build(
        contacts: &[Contact],
        profile: Option<&Profile>,
        selected: Option<ContactId>,
    ) -> Self {
        let mut sections: Vec<ContactSection> = Vec::new();
        for contact in contacts {
            let row = ContactRow {
                id: contact.id,
                name: contact.name.clone(),
                email: contact.email.clone(),
                emblem: contact.emblem.clone(),
                selected: selected == Some(contact.id),
            };
            match sections.last_mut() {
                Some(section) if section.letter == contact.group => section.rows.push(row),
                _ => sections.push(ContactSection {
                    letter: contact.group.clone(),
                    rows: vec![row],
                }),
            }
        }

        Self {
            me: profile.map(|p| ContactRow {
                id: p.id,
                name: format!("{} (You)", p.username),
                email: p.email.clone(),
                emblem: p.emblem.clone(),
                selected: false,
            }),
            sections,
            details: selected.and_then(|id| contacts.iter().find(|c| c.id == id).cloned()),
        }
    }
}

impl fmt::Display for ContactRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.selected { '>' } else { ' ' };
        write!(f, "{} [{:>2}] {} <{}> (#{})", marker, self.emblem, self.name, self.email, self.id)
    }
}

impl fmt::Display for ContactListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(me) = &self.me {
            writeln!(f, "{}", me)?;
        }
        for section in &self.sections {
            writeln!(f, "{}", section.letter)?;
            for row in &section.rows {
                writeln!(f, "{}", row)?;
            }
        }
        if let Some(c) = &self.details {
            writeln!(f)?;
            writeln!(f, "{}\n  Email: {}\n  Phone: {}", c.name, c.email, c.phone)?;
        }
        Ok(())
    }
}
