use std::sync::Arc;

use super::FlowError;
use crate::api::ApiClient;
use crate::core::board::DragState;
use crate::core::task::{CardId, NewTask, Task, TaskStatus};
use crate::store::Store;
use crate::view::BoardView;

/// Board page: moves cards between columns and keeps the task cache current.
///
/// Every write is followed by a full task reload; nothing is changed locally
/// ahead of the server.
pub struct BoardController {
    api: ApiClient,
    store: Arc<Store>,
    drag: DragState,
}

impl BoardController {
    pub fn new(api: ApiClient, store: Arc<Store>) -> Self {
        Self {
            api,
            store,
            drag: DragState::default(),
        }
    }

    pub async fn init(&self) -> Result<(), FlowError> {
        self.store.reload_users(&self.api).await?;
        self.store.reload_tasks(&self.api).await?;
        Ok(())
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn start_drag(&mut self, card_id: CardId) {
        self.drag.start_drag(card_id);
    }

    pub fn drag_over(&mut self, status: TaskStatus) {
        self.drag.highlight(status);
    }

    pub fn drag_leave(&mut self, status: TaskStatus) {
        self.drag.clear_highlight(status);
    }

    /// Finishes a drag on `target`. `Ok(None)` when no drag was in progress.
    pub async fn drop_on(
        &mut self,
        target: TaskStatus,
    ) -> Result<Option<Arc<Vec<Task>>>, FlowError> {
        let Some(mv) = self.drag.drop_on(target) else {
            log::debug!("Drop on {} without a dragged card, ignoring", target);
            return Ok(None);
        };
        self.move_task(mv.card_id, mv.to).await.map(Some)
    }

    pub async fn move_task(
        &self,
        card_id: CardId,
        status: TaskStatus,
    ) -> Result<Arc<Vec<Task>>, FlowError> {
        log::info!("Moving task {} to {}", card_id, status);
        self.api.update_task_status(card_id, status).await?;
        Ok(self.store.refresh_tasks(&self.api).await?)
    }

    /// Checks or unchecks the `index`-th subtask of a card, as listed on the card.
    pub async fn set_subtask_checked(
        &self,
        card_id: CardId,
        index: usize,
        checked: bool,
    ) -> Result<Arc<Vec<Task>>, FlowError> {
        let tasks = self.store.tasks();
        let task = tasks
            .iter()
            .find(|t| t.card_id == card_id)
            .ok_or_else(|| FlowError::NotFound(format!("task {}", card_id)))?;
        let subtask = task
            .subtasks
            .get(index)
            .ok_or_else(|| FlowError::NotFound(format!("subtask {} of task {}", index, card_id)))?;

        self.api
            .set_subtask_checked(card_id, subtask.id, checked)
            .await?;
        Ok(self.store.refresh_tasks(&self.api).await?)
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Arc<Vec<Task>>, FlowError> {
        if task.title.trim().is_empty() {
            return Err(FlowError::Invalid("Title is required".to_string()));
        }
        self.api.create_task(task).await?;
        log::info!("Created task {:?}", task.title);
        Ok(self.store.refresh_tasks(&self.api).await?)
    }

    pub async fn delete_task(&self, card_id: CardId) -> Result<Arc<Vec<Task>>, FlowError> {
        self.api.delete_task(card_id).await?;
        log::info!("Deleted task {}", card_id);
        Ok(self.store.refresh_tasks(&self.api).await?)
    }

    pub fn view(&self, query: Option<&str>) -> BoardView {
        BoardView::build(&self.store.tasks(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::columns;
    use crate::core::task::Category;
    use crate::flows::testing::{Backend, calls, start};
    use serde_json::json;

    fn backend() -> Backend {
        Backend {
            tasks: vec![
                json!({"cardId": 1, "title": "Design", "category": "User Story", "status": "toDo",
                       "subtasks": [{"id": 11, "subtask": "sketch", "checked": false},
                                    {"id": 12, "subtask": "review", "checked": true}]}),
                json!({"cardId": 2, "title": "Ship", "category": "Development", "status": "inProgress"}),
            ],
            ..Backend::default()
        }
    }

    async fn controller() -> (BoardController, crate::flows::testing::Shared) {
        let (api, shared) = start(backend()).await;
        let board = BoardController::new(api, Arc::new(Store::new()));
        board.store.reload_tasks(&board.api).await.unwrap();
        (board, shared)
    }

    #[tokio::test]
    async fn move_to_done_lands_only_in_done() {
        let (board, shared) = controller().await;
        let tasks = board.move_task(1, TaskStatus::Done).await.unwrap();

        let cols = columns(&tasks);
        for col in &cols {
            let present = col.tasks.iter().any(|t| t.card_id == 1);
            assert_eq!(present, col.status == TaskStatus::Done, "column {}", col.status);
        }
        assert_eq!(
            calls(&shared),
            vec!["GET tasks", "PATCH tasks/1", "GET tasks"]
        );
    }

    #[tokio::test]
    async fn drop_without_drag_does_nothing() {
        let (mut board, shared) = controller().await;
        let before = board.store.tasks();
        board.drag_over(TaskStatus::Done);

        assert!(board.drop_on(TaskStatus::Done).await.unwrap().is_none());
        assert_eq!(board.drag_state().highlighted(), None);
        assert_eq!(calls(&shared), vec!["GET tasks"]);
        assert!(Arc::ptr_eq(&before, &board.store.tasks()));
    }

    #[tokio::test]
    async fn drag_and_drop_moves_the_card() {
        let (mut board, shared) = controller().await;
        board.start_drag(2);
        board.drag_over(TaskStatus::AwaitFeedback);
        let tasks = board.drop_on(TaskStatus::AwaitFeedback).await.unwrap().unwrap();

        let moved = tasks.iter().find(|t| t.card_id == 2).unwrap();
        assert_eq!(moved.status, TaskStatus::AwaitFeedback);
        assert_eq!(board.drag_state().dragged(), None);
        assert!(calls(&shared).contains(&"PATCH tasks/2".to_string()));
    }

    #[tokio::test]
    async fn checking_a_subtask_updates_progress() {
        let (board, shared) = controller().await;
        let tasks = board.set_subtask_checked(1, 0, true).await.unwrap();
        let progress = tasks[0].progress().unwrap();
        assert_eq!(progress.label(), "2/2 Subtasks");
        assert_eq!(progress.percent(), 100);
        assert!(calls(&shared).contains(&"PATCH tasks/1/subtasks/11".to_string()));
    }

    #[tokio::test]
    async fn unknown_subtask_is_not_found() {
        let (board, shared) = controller().await;
        assert!(matches!(
            board.set_subtask_checked(1, 5, true).await,
            Err(FlowError::NotFound(_))
        ));
        assert!(matches!(
            board.set_subtask_checked(99, 0, true).await,
            Err(FlowError::NotFound(_))
        ));
        assert_eq!(calls(&shared), vec!["GET tasks"]);
    }

    #[tokio::test]
    async fn create_task_with_two_subtasks() {
        let (board, _shared) = controller().await;
        let new_task = NewTask::new("Write tests", Category::TechnicalTask)
            .with_subtask("unit")
            .with_subtask("integration");
        let tasks = board.create_task(&new_task).await.unwrap();
        let created = tasks.iter().find(|t| t.title == "Write tests").unwrap();
        assert_eq!(created.status, TaskStatus::ToDo);
        assert_eq!(created.progress().unwrap().label(), "0/2 Subtasks");
    }

    #[tokio::test]
    async fn blank_title_is_rejected_locally() {
        let (board, shared) = controller().await;
        let result = board.create_task(&NewTask::new("  ", Category::Editing)).await;
        assert!(matches!(result, Err(FlowError::Invalid(_))));
        assert_eq!(calls(&shared), vec!["GET tasks"]);
    }

    #[tokio::test]
    async fn delete_task_reloads() {
        let (board, _shared) = controller().await;
        let tasks = board.delete_task(2).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(board.view(None).columns[1].cards.is_empty());
    }
}
