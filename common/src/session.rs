//! セッション一式の組み立て
//!
//! ブラウザとCLIはそれぞれのストア・スケジューラ・サービスを渡して
//! ここで各コンポーネントを結線する。

use std::rc::Rc;

use crate::chat::ChatSession;
use crate::history::HistoryStore;
use crate::notification::NotificationCenter;
use crate::scheduler::Scheduler;
use crate::service::AtsService;
use crate::storage::KeyValueStore;
use crate::workflow::AnalysisWorkflow;

#[derive(Clone)]
pub struct Session {
    pub notifications: NotificationCenter,
    pub history: HistoryStore,
    pub workflow: AnalysisWorkflow,
    pub chat: ChatSession,
    pub service: Rc<dyn AtsService>,
}

impl Session {
    pub fn new(
        service: Rc<dyn AtsService>,
        storage: Rc<dyn KeyValueStore>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let notifications = NotificationCenter::new(scheduler.clone());
        let history = HistoryStore::load(storage);
        let workflow = AnalysisWorkflow::new(
            service.clone(),
            notifications.clone(),
            history.clone(),
            scheduler,
        );
        let chat = ChatSession::new(service.clone(), workflow.clone());
        Self {
            notifications,
            history,
            workflow,
            chat,
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeService;
    use crate::scheduler::ManualScheduler;
    use crate::storage::MemoryStore;
    use crate::validation::UploadFile;
    use crate::workflow::WorkflowStep;
    use futures::executor::block_on;

    #[test]
    fn test_components_share_state() {
        let storage = MemoryStore::new();
        let session = Session::new(
            Rc::new(FakeService::default()),
            Rc::new(storage.clone()),
            Rc::new(ManualScheduler::new()),
        );
        session
            .workflow
            .set_resume(Some(UploadFile::new("cv.pdf", "", vec![0; 4])));
        block_on(session.workflow.submit());

        assert_eq!(session.workflow.step(), WorkflowStep::Insights);
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.notifications.len(), 1);

        // 再起動相当: 同じストアから履歴が戻る
        let reopened = Session::new(
            Rc::new(FakeService::default()),
            Rc::new(storage),
            Rc::new(ManualScheduler::new()),
        );
        assert_eq!(reopened.history.len(), 1);
        let id = reopened.history.entries()[0].id.clone();
        assert!(reopened.workflow.select_from_history(&id));
        assert_eq!(reopened.workflow.step(), WorkflowStep::Insights);
    }
}
