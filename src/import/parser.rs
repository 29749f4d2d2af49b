//! 导入行解析与译文合并
//!
//! 行格式：`WORD:T1,T2,...`。单词与译文之间只能有一个冒号；
//! 译文之间可以用逗号或两个保留字符分隔。

/// 单词与译文之间的分隔符
pub const WORD_SEPARATOR: char = ':';

/// 译文分隔符：逗号，以及旧语料中 Arabic comma 乱码产生的 `Ø` 与 `Œ`
pub const TRANSLATION_SEPARATORS: [char; 3] = [',', '\u{00D8}', '\u{0152}'];

/// 解析成功的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub word: String,
    pub translations: Vec<String>,
}

/// 格式错误的行（冒号切分后不是恰好两段）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed;

/// 解析一行
///
/// 按冒号切分必须恰好得到两段，否则为格式错误（无冒号与多个冒号都算）。
/// 单词与每个译文两端空白会被去除，去除后为空的译文被丢弃。
pub fn parse_line(line: &str) -> Result<ParsedLine, Malformed> {
    let mut parts = line.split(WORD_SEPARATOR);

    let (word, rest) = match (parts.next(), parts.next(), parts.next()) {
        (Some(word), Some(rest), None) => (word, rest),
        _ => return Err(Malformed),
    };

    let translations = rest
        .split(&TRANSLATION_SEPARATORS[..])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ParsedLine {
        word: word.trim().to_string(),
        translations,
    })
}

/// 合并译文（保序集合并）
///
/// 已有译文保持原有相对顺序（其中的重复项只保留第一次出现）；
/// 新译文按首次出现顺序追加，精确字符串比较去重。返回合并结果与新增数量。
pub fn merge_translations(existing: Vec<String>, candidates: &[String]) -> (Vec<String>, usize) {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + candidates.len());
    for translation in existing {
        if !merged.contains(&translation) {
            merged.push(translation);
        }
    }

    let mut added = 0;

    for candidate in candidates {
        if !merged.iter().any(|t| t == candidate) {
            merged.push(candidate.clone());
            added += 1;
        }
    }

    (merged, added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_simple_line() {
        let parsed = parse_line("cat:feline,kitty").unwrap();
        assert_eq!(parsed.word, "cat");
        assert_eq!(parsed.translations, strings(&["feline", "kitty"]));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let parsed = parse_line("  dog  :  bark ,  woof  ").unwrap();
        assert_eq!(parsed.word, "dog");
        assert_eq!(parsed.translations, strings(&["bark", "woof"]));
    }

    #[test]
    fn test_parse_malformed_lines() {
        assert_eq!(parse_line("nocolonhere"), Err(Malformed));
        assert_eq!(parse_line("a:b:c"), Err(Malformed));
        assert_eq!(parse_line(""), Err(Malformed));
        assert_eq!(parse_line("::"), Err(Malformed));
    }

    #[test]
    fn test_parse_drops_empty_candidates() {
        let parsed = parse_line("cat:,feline,, ,kitty,").unwrap();
        assert_eq!(parsed.translations, strings(&["feline", "kitty"]));

        let parsed = parse_line("cat:").unwrap();
        assert!(parsed.translations.is_empty());
    }

    #[test]
    fn test_parse_keeps_duplicates_for_merge() {
        let parsed = parse_line("dog: bark, bark").unwrap();
        assert_eq!(parsed.translations, strings(&["bark", "bark"]));
    }

    #[test]
    fn test_unicode_separators_match_comma() {
        let comma = parse_line("cat:feline,kitty,tom").unwrap();
        let o_slash = parse_line("cat:feline\u{00D8}kitty\u{00D8}tom").unwrap();
        let oe = parse_line("cat:feline\u{0152}kitty\u{0152}tom").unwrap();
        let mixed = parse_line("cat:feline\u{00D8} kitty \u{0152}tom").unwrap();

        assert_eq!(comma, o_slash);
        assert_eq!(comma, oe);
        assert_eq!(comma, mixed);
    }

    #[test]
    fn test_merge_preserves_existing_order() {
        let (merged, added) =
            merge_translations(strings(&["feline"]), &strings(&["feline", "kitty"]));
        assert_eq!(merged, strings(&["feline", "kitty"]));
        assert_eq!(added, 1);
    }

    #[test]
    fn test_merge_dedupes_within_candidates() {
        let (merged, added) = merge_translations(Vec::new(), &strings(&["bark", "bark"]));
        assert_eq!(merged, strings(&["bark"]));
        assert_eq!(added, 1);
    }

    #[test]
    fn test_merge_collapses_stored_duplicates() {
        let (merged, added) = merge_translations(strings(&["a", "a"]), &strings(&["b"]));
        assert_eq!(merged, strings(&["a", "b"]));
        assert_eq!(added, 1);

        let (merged, added) = merge_translations(strings(&["a", "b", "a"]), &strings(&["a"]));
        assert_eq!(merged, strings(&["a", "b"]));
        assert_eq!(added, 0);
    }

    #[test]
    fn test_merge_is_case_sensitive() {
        let (merged, _) = merge_translations(strings(&["Bark"]), &strings(&["bark"]));
        assert_eq!(merged, strings(&["Bark", "bark"]));
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(
            existing in proptest::collection::vec("[a-c]{1,2}", 0..6),
            candidates in proptest::collection::vec("[a-c]{1,2}", 0..6),
        ) {
            let (once, _) = merge_translations(existing, &candidates);
            let (twice, added) = merge_translations(once.clone(), &candidates);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(added, 0);
        }

        #[test]
        fn prop_merge_keeps_existing_prefix(
            existing in proptest::collection::vec("[a-d]{1,3}", 0..6),
            candidates in proptest::collection::vec("[a-d]{1,3}", 0..6),
        ) {
            let mut unique: Vec<String> = Vec::new();
            for t in &existing {
                if !unique.contains(t) {
                    unique.push(t.clone());
                }
            }

            let (merged, added) = merge_translations(existing, &candidates);
            prop_assert_eq!(&merged[..unique.len()], &unique[..]);
            prop_assert_eq!(merged.len(), unique.len() + added);
            for candidate in &candidates {
                prop_assert!(merged.contains(candidate));
            }
        }

        #[test]
        fn prop_merge_has_no_duplicates(
            existing in proptest::collection::vec("[a-c]{1,2}", 0..8),
            candidates in proptest::collection::vec("[a-c]{1,2}", 0..8),
        ) {
            let (merged, _) = merge_translations(existing, &candidates);
            for (i, t) in merged.iter().enumerate() {
                prop_assert!(!merged[i + 1..].contains(t));
            }
        }
    }
}
