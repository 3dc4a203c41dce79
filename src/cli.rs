use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "resume-ats")]
#[command(about = "履歴書ATS解析クライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 履歴書を解析してスコアを表示
    Analyze {
        /// 履歴書ファイル (PDF/DOCX/DOC)
        #[arg(required = true)]
        resume: PathBuf,

        /// 求人票ファイル
        #[arg(long, conflicts_with = "jd_text")]
        jd_file: Option<PathBuf>,

        /// 求人票テキスト
        #[arg(long)]
        jd_text: Option<String>,

        /// 結果のJSONを出力するファイル
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 解析履歴
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 解析結果についてアシスタントと対話
    Chat {
        /// 対象の履歴ID（省略時は最新）
        #[arg(long)]
        entry: Option<String>,
    },

    /// 解析結果からカバーレターを生成
    CoverLetter {
        /// 対象の履歴ID（省略時は最新）
        #[arg(long)]
        entry: Option<String>,

        /// 求人票テキスト
        #[arg(long)]
        jd_text: Option<String>,

        /// 出力ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// LinkedInプロフィール（テキスト）を解析
    Linkedin {
        /// プロフィールのテキストファイル
        #[arg(required = true)]
        file: PathBuf,
    },

    /// テキストからATS向けの整形済みファイルを生成
    AtsPdf {
        /// 履歴書本文のテキストファイル
        #[arg(required = true)]
        file: PathBuf,

        /// 出力ファイル名に使う氏名
        #[arg(long, default_value = "Resume")]
        name: String,
    },

    /// 設定を表示/編集
    Config {
        /// 解析サービスのURLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 一覧を表示
    List,
    /// 詳細を表示
    Show {
        #[arg(required = true)]
        id: String,
    },
    /// 1件削除
    Remove {
        #[arg(required = true)]
        id: String,
    },
    /// すべて削除
    Clear {
        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_jd_sources_conflict() {
        let result = Cli::try_parse_from([
            "resume-ats", "analyze", "cv.pdf", "--jd-file", "jd.pdf", "--jd-text", "rust",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ats_pdf_default_name() {
        let cli = Cli::parse_from(["resume-ats", "ats-pdf", "resume.txt"]);
        match cli.command {
            Commands::AtsPdf { file, name } => {
                assert_eq!(file, PathBuf::from("resume.txt"));
                assert_eq!(name, "Resume");
            }
            _ => panic!("expected ats-pdf"),
        }
    }

    #[test]
    fn test_history_show() {
        let cli = Cli::try_parse_from(["resume-ats", "history", "show", "1700000000000"]).unwrap();
        match cli.command {
            Commands::History { action: HistoryAction::Show { id } } => {
                assert_eq!(id, "1700000000000")
            }
            _ => panic!("unexpected command"),
        }
    }
}
