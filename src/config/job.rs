use crate::error::HocrPdfError;

/// ページ範囲文字列をパースしてページ番号のベクタに変換する。
///
/// 形式:
/// - 単一ページ: `"5"`
/// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - 混合（カンマ区切り）: `"1, 3, 5-10, 15"`
///
/// ページ番号は1始まり。結果はソート済み・重複なし。
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(HocrPdfError::config("Page range cannot be empty"));
    }

    let mut pages = Vec::new();

    for part in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((first, last)) => {
                let first = parse_page_number(first)?;
                let last = parse_page_number(last)?;
                if first > last {
                    return Err(HocrPdfError::config(format!(
                        "Invalid page range: start ({first}) > end ({last})"
                    )));
                }
                pages.extend(first..=last);
            }
            None => pages.push(parse_page_number(part)?),
        }
    }

    if pages.is_empty() {
        return Err(HocrPdfError::config("Page range resolved to empty set"));
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn parse_page_number(s: &str) -> crate::error::Result<u32> {
    let s = s.trim();
    match s.parse::<u32>() {
        Ok(0) => Err(HocrPdfError::config("Page numbers start at 1")),
        Ok(n) => Ok(n),
        Err(_) => Err(HocrPdfError::config(format!("Invalid page number: '{s}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_range() {
        let pages = parse_page_range("3, 1-2, 2").expect("valid range");
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_rejected() {
        assert!(parse_page_range("0-2").is_err());
    }

    #[test]
    fn test_reversed_rejected() {
        assert!(parse_page_range("5-3").is_err());
    }
}
