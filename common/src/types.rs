//! 解析結果の型定義
//!
//! 解析サービスのレスポンスはこのクレートにとって不透明な値で、
//! 読むのは総合スコア・候補者名・不足キーワードなど一部のフィールドだけ。

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 候補者名が取れなかった場合の表示
pub const UNKNOWN_CANDIDATE: &str = "Not Found";

/// スコア内訳の表示順
pub const SCORE_ORDER: [&str; 7] = [
    "keyword_match",
    "skills_match",
    "impact_score",
    "experience_relevance",
    "education",
    "format_ats_friendly",
    "completeness",
];

/// 解析サービスのレスポンス本体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisPayload(pub Value);

impl AnalysisPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// `results` オブジェクト（なければ全体をそれとみなす）
    fn results(&self) -> &Value {
        match self.0.get("results") {
            Some(results) if results.is_object() => results,
            _ => &self.0,
        }
    }

    /// 総合スコア（0〜100に丸める）
    pub fn overall_score(&self) -> Option<f64> {
        self.results()
            .get("overall_score")
            .and_then(Value::as_f64)
            .map(|s| s.clamp(0.0, 100.0))
    }

    pub fn candidate_name(&self) -> String {
        let results = self.results();
        results
            .get("candidate_name")
            .and_then(Value::as_str)
            .or_else(|| {
                self.0
                    .pointer("/parsed_resume/contact_info/name")
                    .and_then(Value::as_str)
            })
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_CANDIDATE)
            .to_string()
    }

    /// 不足キーワード
    ///
    /// `keyword_match.missing_keywords` を優先し、なければ
    /// `skills_match.missing_skills` を使う。
    pub fn missing_keywords(&self) -> Vec<String> {
        let results = self.results();
        let from = |pointer: &str| -> Option<Vec<String>> {
            results.pointer(pointer).and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
        };
        from("/keyword_match/missing_keywords")
            .or_else(|| from("/skills_match/missing_skills"))
            .unwrap_or_default()
    }

    pub fn strengths(&self) -> Vec<String> {
        string_list(self.results().get("strengths"))
    }

    pub fn recommendations(&self) -> Vec<String> {
        string_list(self.results().get("recommendations"))
    }

    fn server_rating(&self) -> Option<&str> {
        self.results()
            .get("rating")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    /// 判定の分類（バッジの色分け用）
    ///
    /// サーバーの判定があればそれを分類し、なければスコアから算出。
    pub fn rating(&self) -> Option<Rating> {
        match self.server_rating() {
            Some(label) => Some(Rating::from_label(label)),
            None => self.overall_score().map(Rating::from_score),
        }
    }

    /// 表示する判定文字列（サーバーの値はそのまま）
    pub fn rating_label(&self) -> Option<String> {
        match self.server_rating() {
            Some(label) => Some(label.to_string()),
            None => self.rating().map(|r| r.label().to_string()),
        }
    }

    /// スキル情報（カバーレター生成に渡す）
    pub fn skills(&self) -> Value {
        self.results().get("skills").cloned().unwrap_or(Value::Null)
    }

    /// 生成済みレポートのファイル名（種類, ファイル名）
    pub fn report_files(&self) -> Vec<(String, String)> {
        let Some(reports) = self.0.get("reports").and_then(Value::as_object) else {
            return Vec::new();
        };
        reports
            .iter()
            .filter_map(|(kind, name)| name.as_str().map(|n| (kind.clone(), n.to_string())))
            .collect()
    }

    /// 職歴（終了年の新しい順）
    pub fn timeline(&self) -> Vec<TimelineItem> {
        let Some(items) = self.0.pointer("/parsed_resume/experience").and_then(Value::as_array) else {
            return Vec::new();
        };
        let text = |item: &Value, keys: &[&str]| {
            keys.iter()
                .find_map(|key| item.get(*key).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };
        let mut entries: Vec<TimelineItem> = items
            .iter()
            .filter(|item| item.is_object())
            .map(|item| TimelineItem {
                title: text(item, &["title", "position", "role"]),
                organization: text(item, &["company", "organization"]),
                period: text(item, &["period", "dates", "duration"]),
            })
            .collect();
        sort_timeline(&mut entries, |e| e.period.as_str());
        entries
    }

    /// スコア内訳（表示名, 値）
    ///
    /// [`SCORE_ORDER`] の順に並べ、未知のキーはその後ろに名前順で続ける。
    pub fn score_breakdown(&self) -> Vec<(String, f64)> {
        let Some(scores) = self.results().get("scores").and_then(Value::as_object) else {
            return Vec::new();
        };
        let mut items: Vec<(String, f64)> = SCORE_ORDER
            .iter()
            .filter_map(|key| {
                scores
                    .get(*key)
                    .and_then(Value::as_f64)
                    .map(|v| (score_label(key), v))
            })
            .collect();

        let mut rest: Vec<(&String, f64)> = scores
            .iter()
            .filter(|(key, _)| !SCORE_ORDER.contains(&key.as_str()))
            .filter_map(|(key, v)| v.as_f64().map(|v| (key, v)))
            .collect();
        rest.sort_by(|a, b| a.0.cmp(b.0));
        items.extend(rest.into_iter().map(|(key, v)| (score_label(key), v)));
        items
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// スコア項目キーの表示名
pub fn score_label(key: &str) -> String {
    match key {
        "keyword_match" => "Keyword Match".into(),
        "skills_match" => "Skills Match".into(),
        "format_ats_friendly" => "ATS Format".into(),
        "impact_score" => "Impact Score".into(),
        "completeness" => "Completeness".into(),
        "experience_relevance" => "Experience".into(),
        "education" => "Education".into(),
        other => other
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// 総合評価
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl Rating {
    pub const EXCELLENT_THRESHOLD: f64 = 80.0;
    pub const GOOD_THRESHOLD: f64 = 60.0;
    pub const FAIR_THRESHOLD: f64 = 40.0;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::EXCELLENT_THRESHOLD {
            Rating::Excellent
        } else if score >= Self::GOOD_THRESHOLD {
            Rating::Good
        } else if score >= Self::FAIR_THRESHOLD {
            Rating::Fair
        } else {
            Rating::NeedsImprovement
        }
    }

    /// サーバー側の文字列判定を読む（大文字小文字は無視）
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("excellent") {
            Rating::Excellent
        } else if lower.contains("good") {
            Rating::Good
        } else if lower.contains("fair") {
            Rating::Fair
        } else {
            Rating::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Rating::Excellent => "badge-excellent",
            Rating::Good => "badge-good",
            Rating::Fair | Rating::NeedsImprovement => "badge-fair",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Rating::Excellent => "#10b981",
            Rating::Good => "#f59e0b",
            Rating::Fair | Rating::NeedsImprovement => "#ef4444",
        }
    }
}

/// 職歴の1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    pub title: String,
    pub organization: String,
    pub period: String,
}

lazy_static! {
    static ref YEAR: Regex = Regex::new(r"\b(19|20)\d{2}\b").unwrap();
    static ref ONGOING: Regex = Regex::new(r"(?i)\b(present|current|now|ongoing)\b").unwrap();
}

/// 期間文字列の終了年
///
/// "Present"/"Current" は最大値として扱う。年が読めなければ `None`。
pub fn end_year(period: &str) -> Option<u32> {
    if ONGOING.is_match(period) {
        return Some(u32::MAX);
    }
    YEAR.find_iter(period)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .max()
}

/// 職歴を終了年の新しい順に並べる（年なしは末尾、同順位は元の順）
pub fn sort_timeline<T>(items: &mut [T], period: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        let ya = end_year(period(a));
        let yb = end_year(period(b));
        yb.cmp(&ya)
    });
}
