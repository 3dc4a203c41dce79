//! メインアプリケーションコンポーネント

use leptos::prelude::*;
use leptos::task::spawn_local;
use resume_ats_common::{
    ChatMessage, HistoryEntry, Notification, Session, SessionState, WorkflowStep,
};
use std::rc::Rc;

use crate::api::ats::{FetchAtsService, DEFAULT_API_URL};
use crate::components::{
    chat_panel::ChatPanel, header::Header, history_panel::HistoryPanel,
    progress_bar::ProgressBar, results_panel::ResultsPanel, toast_stack::ToastStack,
    upload_area::UploadArea,
};
use crate::platform::{BrowserScheduler, BrowserStore};

/// 画面全体で共有するハンドル
///
/// セッションの各部品を購読し、変化をシグナルへ写す。
#[derive(Clone, Copy)]
pub struct AppContext {
    pub session: StoredValue<Session, LocalStorage>,
    pub state: RwSignal<SessionState, LocalStorage>,
    pub notifications: RwSignal<Vec<Notification>>,
    pub history: RwSignal<Vec<HistoryEntry>>,
    pub chat: RwSignal<Vec<ChatMessage>>,
    /// `ChatSession::is_pending` の写し
    pub chat_pending: RwSignal<bool>,
}

impl AppContext {
    fn new(session: Session) -> Self {
        let app = Self {
            session: StoredValue::new_local(session.clone()),
            state: RwSignal::new_local(session.workflow.state()),
            notifications: RwSignal::new(session.notifications.snapshot()),
            history: RwSignal::new(session.history.entries()),
            chat: RwSignal::new(session.chat.transcript()),
            chat_pending: RwSignal::new(session.chat.is_pending()),
        };

        session.workflow.subscribe(move |state| app.state.set(state.clone()));
        session
            .notifications
            .subscribe(move |items| app.notifications.set(items.to_vec()));
        session
            .history
            .subscribe(move |items| app.history.set(items.to_vec()));
        session.chat.subscribe(move |items| {
            app.chat.set(items.to_vec());
            app.chat_pending.set(app.with(|s| s.chat.is_pending()));
        });
        app
    }

    pub fn with<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        self.session.with_value(f)
    }

    pub fn is_waiting(&self) -> bool {
        self.state.with(|s| s.step.is_waiting())
    }

    pub fn submit(&self) {
        let workflow = self.with(|s| s.workflow.clone());
        spawn_local(async move {
            let outcome = workflow.submit().await;
            log::debug!("submit finished: {:?}", outcome);
        });
    }

    pub fn generate_cover_letter(&self) {
        let workflow = self.with(|s| s.workflow.clone());
        spawn_local(async move {
            workflow.generate_cover_letter().await;
        });
    }

    pub fn send_chat(&self, message: String) {
        let chat = self.with(|s| s.chat.clone());
        spawn_local(async move {
            if !chat.send(&message).await {
                log::debug!("chat message not accepted");
            }
        });
    }
}

/// メインアプリケーションコンポーネント
#[component]
pub fn App() -> impl IntoView {
    let session = Session::new(
        Rc::new(FetchAtsService::new(DEFAULT_API_URL)),
        Rc::new(BrowserStore),
        Rc::new(BrowserScheduler),
    );
    let app = AppContext::new(session);
    let has_result = move || app.state.with(|s| s.step == WorkflowStep::Insights);

    view! {
        <div class="container">
            <Header />
            <ToastStack app=app />

            <div class="layout">
                <main class="main-column">
                    <Show
                        when=has_result
                        fallback=move || view! {
                            <UploadArea app=app />
                            <Show when=move || app.is_waiting()>
                                <ProgressBar app=app />
                            </Show>
                        }
                    >
                        <ResultsPanel app=app />
                        <ChatPanel app=app />
                    </Show>
                </main>

                <aside class="side-column">
                    <HistoryPanel app=app />
                </aside>
            </div>
        </div>
    }
}
