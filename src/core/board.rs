use super::task::{CardId, Task, TaskStatus};

/// Queries shorter than this show the whole board.
pub const MIN_SEARCH_LEN: usize = 2;

/// Tasks of one status, in backend order.
#[derive(Debug, Clone, PartialEq)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

impl Column<'_> {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Splits tasks into the four status columns. Each task lands in exactly one.
pub fn columns(tasks: &[Task]) -> [Column<'_>; 4] {
    TaskStatus::ALL.map(|status| Column {
        status,
        tasks: tasks.iter().filter(|t| t.status == status).collect(),
    })
}

/// Like [`columns`], restricted to tasks matching `query` once it is long enough.
pub fn search<'a>(tasks: &'a [Task], query: &str) -> [Column<'a>; 4] {
    let query = query.to_lowercase();
    if query.chars().count() < MIN_SEARCH_LEN {
        return columns(tasks);
    }
    TaskStatus::ALL.map(|status| Column {
        status,
        tasks: tasks
            .iter()
            .filter(|t| t.status == status && t.matches_query(&query))
            .collect(),
    })
}

/// Drag-and-drop bookkeeping: one dragged card and one highlighted column at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragState {
    dragged: Option<CardId>,
    highlighted: Option<TaskStatus>,
}

/// What a drop resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub card_id: CardId,
    pub to: TaskStatus,
}

impl DragState {
    pub fn start_drag(&mut self, card_id: CardId) {
        self.dragged = Some(card_id);
    }

    pub fn dragged(&self) -> Option<CardId> {
        self.dragged
    }

    pub fn highlight(&mut self, status: TaskStatus) {
        self.highlighted = Some(status);
    }

    pub fn highlighted(&self) -> Option<TaskStatus> {
        self.highlighted
    }

    pub fn clear_highlight(&mut self, status: TaskStatus) {
        if self.highlighted == Some(status) {
            self.highlighted = None;
        }
    }

    pub fn take_drop(&mut self) -> Option<CardId> {
        self.dragged.take()
    }

    /// Ends the drag over `target`. Returns `None` when nothing was being dragged.
    pub fn drop_on(&mut self, target: TaskStatus) -> Option<Move> {
        self.clear_highlight(target);
        self.take_drop().map(|card_id| Move { card_id, to: target })
    }

    pub fn cancel(&mut self) {
        self.dragged = None;
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::Category;

    fn task(id: CardId, title: &str, status: TaskStatus) -> Task {
        Task {
            card_id: id,
            title: title.to_string(),
            description: String::new(),
            assigned: Vec::new(),
            date: None,
            priority: Default::default(),
            category: Category::Development,
            status,
            subtasks: Vec::new(),
        }
    }

    #[test]
    fn every_task_in_exactly_one_column() {
        let tasks = vec![
            task(1, "a", TaskStatus::ToDo),
            task(2, "b", TaskStatus::Done),
            task(3, "c", TaskStatus::InProgress),
            task(4, "d", TaskStatus::Done),
            task(5, "e", TaskStatus::AwaitFeedback),
        ];
        let cols = columns(&tasks);
        for t in &tasks {
            let hits = cols
                .iter()
                .filter(|c| c.tasks.iter().any(|x| x.card_id == t.card_id))
                .count();
            assert_eq!(hits, 1, "task {}", t.card_id);
        }
        assert_eq!(cols[3].tasks.len(), 2);
        assert_eq!(cols[3].status, TaskStatus::Done);
    }

    #[test]
    fn drop_without_drag_is_noop() {
        let mut drag = DragState::default();
        drag.highlight(TaskStatus::Done);
        assert_eq!(drag.drop_on(TaskStatus::Done), None);
        assert_eq!(drag.highlighted(), None);
    }

    #[test]
    fn drop_consumes_the_dragged_card() {
        let mut drag = DragState::default();
        drag.start_drag(42);
        drag.highlight(TaskStatus::AwaitFeedback);
        assert_eq!(
            drag.drop_on(TaskStatus::AwaitFeedback),
            Some(Move {
                card_id: 42,
                to: TaskStatus::AwaitFeedback
            })
        );
        assert_eq!(drag.dragged(), None);
        assert_eq!(drag.drop_on(TaskStatus::Done), None);
    }

    #[test]
    fn second_drag_replaces_first() {
        let mut drag = DragState::default();
        drag.start_drag(1);
        drag.start_drag(2);
        assert_eq!(drag.drop_on(TaskStatus::ToDo).map(|m| m.card_id), Some(2));
    }

    #[test]
    fn short_query_shows_everything() {
        let tasks = vec![task(1, "Alpha", TaskStatus::ToDo), task(2, "Beta", TaskStatus::Done)];
        let cols = search(&tasks, "a");
        assert_eq!(cols.iter().map(|c| c.tasks.len()).sum::<usize>(), 2);
    }

    #[test]
    fn leading_space_counts_toward_query() {
        let tasks = vec![task(1, "Big apple", TaskStatus::ToDo), task(2, "apple", TaskStatus::Done)];
        let cols = search(&tasks, " a");
        assert_eq!(cols[0].tasks.len(), 1);
        assert!(cols[3].is_empty());
    }

    #[test]
    fn search_filters_and_keeps_columns() {
        let tasks = vec![
            task(1, "Login page", TaskStatus::ToDo),
            task(2, "Logout button", TaskStatus::Done),
            task(3, "Board", TaskStatus::Done),
        ];
        let cols = search(&tasks, "LOG");
        assert_eq!(cols[0].tasks.len(), 1);
        assert_eq!(cols[3].tasks.len(), 1);
        assert_eq!(cols[3].tasks[0].card_id, 2);
        assert!(cols[1].is_empty());
    }
}
