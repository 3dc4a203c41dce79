use clap::Parser;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use resume_ats::cli::{Cli, Commands, HistoryAction};
use resume_ats::client::HttpAtsService;
use resume_ats::config::Config;
use resume_ats::error::{AtsCliError, Result};
use resume_ats::file_store::JsonFileStore;
use resume_ats::runtime::TokioScheduler;
use resume_ats::{logging, upload};
use resume_ats_common::service::AtsPdfRequest;
use resume_ats_common::types::score_label;
use resume_ats_common::{
    AnalysisPayload, AtsService, ChatRole, HistoryEntry, JobDescription, Notification, Session,
    SubmitOutcome,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let _logger = logging::init_logging(&config.log_level, cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(cli, config))?;
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Analyze { resume, jd_file, jd_text, output } => {
            println!("📄 resume-ats - 履歴書解析\n");
            let session = open_session(&config)?;

            let file = upload::read_upload(&resume)?;
            println!("- 履歴書: {} ({} bytes)", file.name, file.size);
            session.workflow.set_resume(Some(file));
            if let Some(path) = jd_file {
                let jd = upload::read_upload(&path)?;
                println!("- 求人票: {}", jd.name);
                session.workflow.set_job_description(Some(JobDescription::File(jd)));
            } else if let Some(text) = jd_text {
                session.workflow.set_job_description_text(&text);
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .map_err(|e| AtsCliError::Config(e.to_string()))?,
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            let caption_bar = spinner.clone();
            session.workflow.subscribe(move |state| {
                if let Some(caption) = &state.caption {
                    caption_bar.set_message(caption.clone());
                }
            });
            print_notifications(&session, Some(spinner.clone()));

            let outcome = session.workflow.submit().await;
            spinner.finish_and_clear();

            match outcome {
                SubmitOutcome::Completed => {
                    let Some(result) = session.workflow.current_result() else {
                        return Err(AtsCliError::NoResult);
                    };
                    print_result(&result, session.service.as_ref());
                    if let Some(history_id) = session.workflow.state().history_id {
                        println!("\n履歴ID: {}", history_id);
                    }
                    if let Some(output) = output {
                        let json = serde_json::to_string_pretty(&result)?;
                        std::fs::write(&output, json)?;
                        println!("✔ 結果を保存: {}", output.display());
                    }
                    println!("\n✅ 解析完了");
                }
                SubmitOutcome::Invalid(e) => return Err(resume_ats_common::Error::from(e).into()),
                SubmitOutcome::Failed(failure) => {
                    return Err(resume_ats_common::Error::from(failure).into())
                }
                SubmitOutcome::Busy => println!("⚠ 別の解析が実行中です"),
            }
        }

        Commands::History { action } => {
            let session = open_session(&config)?;
            match action {
                HistoryAction::List => {
                    let entries = session.history.entries();
                    if entries.is_empty() {
                        println!("履歴はありません");
                    }
                    for entry in &entries {
                        print_history_line(entry);
                    }
                }
                HistoryAction::Show { id } => {
                    if !session.workflow.select_from_history(&id) {
                        return Err(AtsCliError::HistoryNotFound(id));
                    }
                    let result = session
                        .workflow
                        .current_result()
                        .ok_or(AtsCliError::NoResult)?;
                    print_result(&result, session.service.as_ref());
                }
                HistoryAction::Remove { id } => {
                    if session.history.get(&id).is_none() {
                        return Err(AtsCliError::HistoryNotFound(id));
                    }
                    session.history.remove(&id)?;
                    println!("✔ 削除しました: {}", id);
                }
                HistoryAction::Clear { yes } => {
                    let confirmed = yes
                        || Confirm::new()
                            .with_prompt(format!("履歴{}件をすべて削除しますか？", session.history.len()))
                            .default(false)
                            .interact()?;
                    if confirmed {
                        session.history.clear()?;
                        println!("✔ 履歴を削除しました");
                    }
                }
            }
        }

        Commands::Chat { entry } => {
            println!("💬 resume-ats - アシスタント\n");
            let session = open_session(&config)?;
            load_entry(&session, entry.as_deref())?;

            for message in session.chat.transcript() {
                println!("🤖 {}", message.text);
            }
            println!("（空行または exit で終了）\n");

            loop {
                let line: String = Input::new()
                    .with_prompt("あなた")
                    .allow_empty(true)
                    .interact_text()?;
                let line = line.trim();
                if line.is_empty() || line == "exit" || line == "quit" {
                    break;
                }
                session.chat.send(line).await;
                if let Some(reply) = session
                    .chat
                    .transcript()
                    .into_iter()
                    .rev()
                    .find(|m| m.role == ChatRole::Assistant)
                {
                    println!("🤖 {}\n", reply.text);
                }
            }
        }

        Commands::CoverLetter { entry, jd_text, output } => {
            println!("✉ resume-ats - カバーレター生成\n");
            let session = open_session(&config)?;
            load_entry(&session, entry.as_deref())?;
            if let Some(text) = jd_text {
                session.workflow.set_job_description_text(&text);
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("生成中...");
            spinner.enable_steady_tick(Duration::from_millis(100));
            let letter = session.workflow.generate_cover_letter().await;
            spinner.finish_and_clear();

            match (letter, output) {
                (Some(letter), Some(output)) => {
                    std::fs::write(&output, letter)?;
                    println!("✔ カバーレターを保存: {}", output.display());
                }
                (Some(letter), None) => println!("{}", letter),
                (None, _) => println!("✗ カバーレターを生成できませんでした"),
            }
        }

        Commands::Linkedin { file } => {
            println!("🔗 resume-ats - LinkedIn解析\n");
            let text = read_text(&file)?;
            let service = HttpAtsService::from_config(&config)?;
            let value = service
                .analyze_linkedin(&text)
                .await
                .map_err(resume_ats_common::Error::from)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        Commands::AtsPdf { file, name } => {
            println!("📄 resume-ats - ATS向けファイル生成\n");
            let text = read_text(&file)?;
            let service = HttpAtsService::from_config(&config)?;
            let filename = service
                .generate_ats_pdf(&AtsPdfRequest { name, text })
                .await
                .map_err(resume_ats_common::Error::from)?;
            println!("✔ 生成しました: {}", service.download_url(&filename));
        }

        Commands::Config { set_api_url, show } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                config.set_api_url(url)?;
                println!("✔ 解析サービスのURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  解析サービス: {}", config.api_url());
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  再試行回数: {}", config.max_retries);
                println!("  ログレベル: {}", config.log_level);
                println!("  保存先: {}", config.store_path()?.display());
            }
        }
    }

    Ok(())
}

fn open_session(config: &Config) -> Result<Session> {
    let service = Rc::new(HttpAtsService::from_config(config)?);
    let store = Rc::new(JsonFileStore::open(&config.store_path()?));
    Ok(Session::new(service, store, Rc::new(TokioScheduler)))
}

/// 履歴から対象の結果を読み込む（ID省略時は最新）
fn load_entry(session: &Session, id: Option<&str>) -> Result<()> {
    let id = match id {
        Some(id) => id.to_string(),
        None => session
            .history
            .entries()
            .first()
            .map(|e| e.id.clone())
            .ok_or(AtsCliError::NoResult)?,
    };
    if !session.workflow.select_from_history(&id) {
        return Err(AtsCliError::HistoryNotFound(id));
    }
    Ok(())
}

/// 新しく追加された通知だけを表示する
fn print_notifications(session: &Session, spinner: Option<ProgressBar>) {
    let seen = RefCell::new(HashSet::new());
    session.notifications.subscribe(move |items: &[Notification]| {
        let mut seen = seen.borrow_mut();
        for n in items.iter().rev().filter(|n| seen.insert(n.id)) {
            let line = format!("{} {}: {}", n.severity.icon(), n.title, n.description);
            match &spinner {
                Some(spinner) => spinner.suspend(|| println!("{}", line)),
                None => println!("{}", line),
            }
        }
    });
}

fn print_history_line(entry: &HistoryEntry) {
    let date = chrono::DateTime::from_timestamp_millis(entry.created_at)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{}  {}  {:>3.0}  {}  {}",
        entry.id, date, entry.score, entry.candidate_name, entry.file_name
    );
}

fn print_result(result: &AnalysisPayload, service: &dyn AtsService) {
    match result.overall_score() {
        Some(score) => println!("総合スコア: {:.0}/100", score),
        None => println!("総合スコア: -"),
    }
    if let Some(rating) = result.rating_label() {
        println!("評価: {}", rating);
    }
    println!("候補者: {}", result.candidate_name());

    let breakdown = result.score_breakdown();
    if !breakdown.is_empty() {
        println!("\nスコア内訳:");
        for (key, value) in breakdown {
            println!("  {:<24} {:>5.1}", score_label(&key), value);
        }
    }

    print_list("強み", &result.strengths());
    print_list("不足キーワード", &result.missing_keywords());
    print_list("改善提案", &result.recommendations());

    let reports = result.report_files();
    if !reports.is_empty() {
        println!("\nレポート:");
        for (kind, file) in reports {
            println!("  {}: {}", kind, service.download_url(&file));
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

fn read_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(AtsCliError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}
