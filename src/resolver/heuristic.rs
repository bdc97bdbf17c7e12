//! 第一阶段：关键词匹配
//!
//! 分数 = 命中的最长触发短语字符数 / 归一化输入字符数（上限 1.0）。
//! 同分时按目录顺序取第一个。

use super::descriptor::{ActionTriggers, DomainDescriptor};

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicMatch {
    pub action: String,
    pub phrase: String,
    pub score: f64,
    pub args: Vec<String>,
}

/// 小写、合并空白、去掉首尾空白
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// ASCII 短语需要落在单词边界上（"ls" 不应命中 "tools"）；其他文字按子串匹配
pub fn phrase_matches(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    if !phrase.is_ascii() {
        return haystack.contains(phrase);
    }

    haystack.match_indices(phrase).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = haystack[..start]
            .chars()
            .last()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        before_ok && after_ok
    })
}

/// 在目录中寻找最佳匹配
///
/// `catalog` 中每个动作的 id 本身也作为隐式触发短语。
/// 参数从原始文本（未归一化）中提取。
pub fn best_match(
    descriptor: &DomainDescriptor,
    catalog: &[ActionTriggers],
    text: &str,
) -> Option<HeuristicMatch> {
    let input = normalize(text);
    let input_len = input.chars().count();
    if input_len == 0 {
        return None;
    }

    let mut best: Option<(&str, String, f64)> = None;

    for entry in catalog {
        let implicit = std::iter::once(entry.action.as_str());
        for phrase in implicit.chain(entry.phrases.iter().map(String::as_str)) {
            let phrase = normalize(phrase);
            if !phrase_matches(&input, &phrase) {
                continue;
            }
            let score = (phrase.chars().count() as f64 / input_len as f64).min(1.0);
            if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                best = Some((entry.action.as_str(), phrase, score));
            }
        }
    }

    best.map(|(action, phrase, score)| HeuristicMatch {
        action: action.to_string(),
        args: descriptor.extract_args(action, text),
        phrase,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::extract::PatternExtractor;

    fn pocket() -> DomainDescriptor {
        DomainDescriptor::new("pocket", "ls")
            .triggers("ls", ["list", "목록", "파일 목록"])
            .triggers("cat", ["show", "내용"])
            .triggers("grep", ["search", "찾아"])
            .extractor(PatternExtractor::new().rule(&["ls"], r"(\S+?)\s*폴더", "$1/"))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  List   THE\tfiles \n"), "list the files");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_ascii_word_boundaries() {
        assert!(phrase_matches("ls docs", "ls"));
        assert!(!phrase_matches("tools", "ls"));
        assert!(phrase_matches("show me", "show"));
        assert!(!phrase_matches("showcase", "show"));
        assert!(phrase_matches("폴더의 목록을", "목록"));
    }

    #[test]
    fn test_scores_by_longest_phrase() {
        let descriptor = pocket();
        let m = best_match(&descriptor, &descriptor.actions, "docs 폴더의 파일 목록 보여줘").unwrap();
        assert_eq!(m.action, "ls");
        assert_eq!(m.phrase, "파일 목록");
        assert_eq!(m.args, vec!["docs/"]);
        assert!((m.score - 5.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_phrase_scores_one() {
        let descriptor = pocket();
        let m = best_match(&descriptor, &descriptor.actions, "  LIST ").unwrap();
        assert_eq!(m.action, "ls");
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_ties_follow_catalog_order() {
        let descriptor = DomainDescriptor::new("d", "a")
            .triggers("a", ["run"])
            .triggers("b", ["run"]);
        let m = best_match(&descriptor, &descriptor.actions, "run it").unwrap();
        assert_eq!(m.action, "a");
    }

    #[test]
    fn test_action_id_is_implicit_trigger() {
        let descriptor = pocket();
        let m = best_match(&descriptor, &descriptor.actions, "grep todo").unwrap();
        assert_eq!(m.action, "grep");
    }

    #[test]
    fn test_no_match() {
        let descriptor = pocket();
        assert!(best_match(&descriptor, &descriptor.actions, "완전히 무관한 문장").is_none());
        assert!(best_match(&descriptor, &descriptor.actions, "").is_none());
    }
}
