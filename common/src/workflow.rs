//! 解析ワークフロー
//!
//! ```text
//! Upload ──submit──▶ Submitting ──送信──▶ Scanning ──成功──▶ Insights
//!   ▲                                        │                 │
//!   └──────────────────失敗───────────────────┘                 │
//!   ▲                                                          │
//!   └─────────────────── submit で再び Submitting へ ◀──────────┘
//! ```
//!
//! - Submitting/Scanning 中の `submit` は何もしない（同時に1リクエストまで）
//! - 進捗キャプションは送信ごとの世代番号に紐づき、
//!   解決済み・別世代の送信には反映されない

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceFailure;
use crate::history::{HistoryEntry, HistoryStore};
use crate::notification::NotificationCenter;
use crate::observe::{emit, Observers, SubscriptionId};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::service::{AnalysisRequest, AtsService, CoverLetterRequest};
use crate::types::AnalysisPayload;
use crate::validation::{validate_resume, JobDescription, UploadFile, ValidationError};

/// 待機中に表示する進捗キャプション（開始からのミリ秒, 文言）
pub const CAPTION_STAGES: [(u64, &str); 4] = [
    (0, "Uploading Resume…"),
    (1500, "Extracting Text & Entities…"),
    (3000, "Running Semantic Analysis…"),
    (4500, "Calculating ATS Score…"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStep {
    #[default]
    Upload,
    Submitting,
    Scanning,
    Insights,
}

impl WorkflowStep {
    /// 応答待ちか
    pub fn is_waiting(&self) -> bool {
        matches!(self, WorkflowStep::Submitting | WorkflowStep::Scanning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Upload => "upload",
            WorkflowStep::Submitting => "submitting",
            WorkflowStep::Scanning => "scanning",
            WorkflowStep::Insights => "insights",
        }
    }
}

/// 画面に渡すセッション状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub step: WorkflowStep,
    pub resume: Option<UploadFile>,
    pub job_description: Option<JobDescription>,
    pub result: Option<AnalysisPayload>,
    pub error_message: Option<String>,
    pub caption: Option<String>,
    /// 結果を表示している履歴エントリ
    pub history_id: Option<String>,
    pub cover_letter: Option<String>,
    pub generating_letter: bool,
    /// 送信ごとに増える世代番号
    pub generation: u64,
}

/// `submit` の結果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 応答待ちのため受け付けなかった
    Busy,
    Invalid(ValidationError),
    Completed,
    Failed(ServiceFailure),
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    observers: Observers<SessionState>,
    caption_timers: Vec<TimerHandle>,
}

/// 解析ワークフロー（UIスレッド内で共有するハンドル）
#[derive(Clone)]
pub struct AnalysisWorkflow {
    inner: Rc<RefCell<Inner>>,
    service: Rc<dyn AtsService>,
    notifications: NotificationCenter,
    history: HistoryStore,
    scheduler: Rc<dyn Scheduler>,
}

impl AnalysisWorkflow {
    pub fn new(
        service: Rc<dyn AtsService>,
        notifications: NotificationCenter,
        history: HistoryStore,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner::default())),
            service,
            notifications,
            history,
            scheduler,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.borrow().state.clone()
    }

    pub fn step(&self) -> WorkflowStep {
        self.inner.borrow().state.step
    }

    pub fn current_result(&self) -> Option<AnalysisPayload> {
        self.inner.borrow().state.result.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.borrow().state.error_message.clone()
    }

    pub fn caption(&self) -> Option<String> {
        self.inner.borrow().state.caption.clone()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn subscribe(&self, callback: impl Fn(&SessionState) + 'static) -> SubscriptionId {
        self.inner.borrow_mut().observers.add(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().observers.remove(id)
    }

    /// ファイルをそのままセットする（検証は `submit` 時）
    pub fn set_resume(&self, file: Option<UploadFile>) {
        self.update(|s| s.resume = file);
    }

    /// ファイル選択
    ///
    /// 検証に通ったファイルだけを保持し、結果を通知する。
    pub fn select_resume(&self, file: UploadFile) -> Result<(), ValidationError> {
        match validate_resume(&file) {
            Ok(()) => {
                let name = file.name.clone();
                self.update(|s| {
                    s.resume = Some(file);
                    s.error_message = None;
                });
                self.notifications
                    .success("File Selected", format!("{} is ready for analysis.", name));
                Ok(())
            }
            Err(e) => {
                self.reject(&e);
                Err(e)
            }
        }
    }

    pub fn set_job_description(&self, job_description: Option<JobDescription>) {
        self.update(|s| s.job_description = job_description);
    }

    /// テキスト入力欄の内容（空白のみなら未指定）
    pub fn set_job_description_text(&self, text: &str) {
        self.set_job_description(JobDescription::from_text(text));
    }

    /// 解析を送信する
    pub async fn submit(&self) -> SubmitOutcome {
        let prepared = {
            let inner = self.inner.borrow();
            if inner.state.step.is_waiting() {
                log::debug!("submit rejected: request already in flight");
                return SubmitOutcome::Busy;
            }
            match inner.state.resume.clone() {
                None => Err(ValidationError::MissingResume),
                Some(resume) => validate_resume(&resume)
                    .map(|()| (resume, inner.state.job_description.clone())),
            }
        };
        let (resume, job_description) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                self.reject(&e);
                return SubmitOutcome::Invalid(e);
            }
        };

        let request = AnalysisRequest {
            resume,
            job_description,
        };
        let generation = self.update(|s| {
            s.generation += 1;
            s.step = WorkflowStep::Submitting;
            s.error_message = None;
            s.caption = Some(CAPTION_STAGES[0].1.to_string());
            s.result = None;
            s.cover_letter = None;
            s.history_id = None;
            s.generation
        });
        log::debug!("submission {} started: {}", generation, request.resume.name);

        let pending = self.service.analyze_resume(&request);
        self.update(|s| s.step = WorkflowStep::Scanning);
        self.schedule_captions(generation);

        let response = pending.await;
        self.cancel_captions();

        match response {
            Ok(payload) => {
                self.complete(payload, &request.resume.name);
                SubmitOutcome::Completed
            }
            Err(failure) => {
                self.fail(&failure);
                SubmitOutcome::Failed(failure)
            }
        }
    }

    /// 履歴の結果を表示する（サービスには問い合わせない）
    pub fn select_from_history(&self, id: &str) -> bool {
        if self.step().is_waiting() {
            return false;
        }
        let Some(entry) = self.history.get(id) else {
            log::debug!("history entry not found: {}", id);
            return false;
        };
        self.update(|s| {
            s.result = Some(entry.result);
            s.history_id = Some(entry.id);
            s.error_message = None;
            s.caption = None;
            s.cover_letter = None;
            s.step = WorkflowStep::Insights;
        });
        true
    }

    /// 新しい解析を始める（応答待ち中は不可）
    pub fn reset(&self) -> bool {
        if self.step().is_waiting() {
            return false;
        }
        self.update(|s| {
            let generation = s.generation;
            *s = SessionState {
                generation,
                ..SessionState::default()
            };
        });
        true
    }

    /// 現在の結果からカバーレターを生成する
    ///
    /// 失敗はログに残すだけで通知しない。
    pub async fn generate_cover_letter(&self) -> Option<String> {
        let request = {
            let inner = self.inner.borrow();
            let state = &inner.state;
            if state.generating_letter {
                return None;
            }
            let result = state.result.as_ref()?;
            CoverLetterRequest {
                name: result.candidate_name(),
                skills: result.skills(),
                job_description: state
                    .job_description
                    .as_ref()
                    .and_then(JobDescription::as_text)
                    .unwrap_or_default()
                    .to_string(),
            }
        };
        self.update(|s| s.generating_letter = true);

        let letter = match self.service.generate_cover_letter(&request).await {
            Ok(letter) => Some(letter),
            Err(failure) => {
                log::warn!("cover letter generation failed: {}", failure.user_message());
                None
            }
        };
        self.update(|s| {
            s.generating_letter = false;
            if letter.is_some() {
                s.cover_letter = letter.clone();
            }
        });
        letter
    }

    fn complete(&self, payload: AnalysisPayload, file_name: &str) {
        self.inner.borrow_mut().state.result = Some(payload.clone());

        let entry = HistoryEntry::from_result(self.next_history_timestamp(), file_name, payload);
        let entry_id = entry.id.clone();
        let score = entry.score;
        let history_id = match self.history.append(entry) {
            Ok(()) => Some(entry_id),
            Err(e) => {
                log::warn!("failed to persist history entry: {}", e);
                None
            }
        };

        self.update(|s| {
            s.error_message = None;
            s.caption = None;
            s.history_id = history_id;
            s.step = WorkflowStep::Insights;
        });
        self.notifications.success(
            "Analysis Complete",
            format!("{} scored {:.0}/100.", file_name, score),
        );
    }

    fn fail(&self, failure: &ServiceFailure) {
        let message = failure.user_message();
        log::debug!("submission failed: {}", message);
        self.update(|s| {
            s.error_message = Some(message.clone());
            s.caption = None;
            s.step = WorkflowStep::Upload;
        });
        self.notifications.error("Analysis Failed", message);
    }

    fn reject(&self, error: &ValidationError) {
        let message = error.to_string();
        self.update(|s| s.error_message = Some(message.clone()));
        self.notifications.warning(error.title(), message);
    }

    /// IDが衝突しないよう、最新エントリより後の時刻を使う
    fn next_history_timestamp(&self) -> i64 {
        let now = self.scheduler.now_millis();
        match self.history.latest_created_at() {
            Some(latest) if now <= latest => latest + 1,
            _ => now,
        }
    }

    fn schedule_captions(&self, generation: u64) {
        let timers: Vec<TimerHandle> = CAPTION_STAGES
            .iter()
            .skip(1)
            .map(|&(offset, caption)| {
                let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
                self.scheduler.schedule(
                    Duration::from_millis(offset),
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            apply_caption(&inner, generation, caption);
                        }
                    }),
                )
            })
            .collect();
        self.inner.borrow_mut().caption_timers = timers;
    }

    fn cancel_captions(&self) {
        let timers = std::mem::take(&mut self.inner.borrow_mut().caption_timers);
        for timer in timers {
            timer.cancel();
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        update(&self.inner, f)
    }
}

/// 発火時点で同じ世代の送信がまだ待機中の場合だけキャプションを更新する
fn apply_caption(inner: &Rc<RefCell<Inner>>, generation: u64, caption: &str) {
    let current = {
        let guard = inner.borrow();
        guard.state.generation == generation && guard.state.step.is_waiting()
    };
    if !current {
        log::debug!("stale caption ignored for submission {}", generation);
        return;
    }
    update(inner, |s| s.caption = Some(caption.to_string()));
}

fn update<R>(inner: &Rc<RefCell<Inner>>, f: impl FnOnce(&mut SessionState) -> R) -> R {
    let (result, callbacks, snapshot) = {
        let mut guard = inner.borrow_mut();
        let result = f(&mut guard.state);
        (result, guard.observers.snapshot(), guard.state.clone())
    };
    emit(callbacks, &snapshot);
    result
}
