use encoding_rs::{Encoding, BIG5, GB18030, GBK, UTF_8};

/// Strict decode order for keyword scanning. `decode` BOM-sniffs, so a UTF-8
/// body with a BOM is handled by the first entry; GBK also accepts the gb2312
/// label's repertoire.
const DECODE_ORDER: &[&Encoding] = &[UTF_8, BIG5, GBK, GB18030];

/// Reports whether `keyword` appears in `body` under best-effort decoding.
///
/// Each encoding in `DECODE_ORDER` is tried in turn; a clean decode that
/// contains the keyword wins immediately. When no strict decode is clean,
/// the answer comes from lossy UTF-8, so the result is always a definite
/// boolean rather than a decode error.
pub fn contains_keyword(body: &[u8], keyword: &str) -> bool {
    for encoding in DECODE_ORDER {
        let (text, _, had_errors) = encoding.decode(body);
        if !had_errors && text.contains(keyword) {
            return true;
        }
    }
    String::from_utf8_lossy(body).contains(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_keyword_in_utf8_body() {
        let body = "<html><body>系統狀態正常</body></html>".as_bytes();
        assert!(contains_keyword(body, "狀態正常"));
    }

    #[test]
    fn finds_keyword_in_big5_body() {
        let (bytes, _, had_errors) = BIG5.encode("網站狀態正常運作中");
        assert!(!had_errors);
        // The Big5 bytes are not valid UTF-8, so this exercises the fallback
        // encodings in the decode order.
        assert!(std::str::from_utf8(&bytes).is_err());
        assert!(contains_keyword(&bytes, "狀態正常"));
    }

    #[test]
    fn finds_keyword_in_gbk_body() {
        let (bytes, _, had_errors) = GBK.encode("系统状态正常");
        assert!(!had_errors);
        assert!(contains_keyword(&bytes, "状态正常"));
    }

    #[test]
    fn missing_keyword_is_a_definite_no() {
        assert!(!contains_keyword(b"<html>all good</html>", "maintenance"));
    }

    #[test]
    fn undecodable_body_falls_back_to_lossy_utf8() {
        // 0x80 is an invalid lead byte in every encoding in the decode order,
        // so only the lossy fallback can answer here.
        let body = b"healthy \x80 system";
        assert!(contains_keyword(body, "healthy"));
        assert!(!contains_keyword(body, "broken"));
    }
}
