/// 將管線讀到的位元組組成 UTF-8 文字，不在多位元組字元中間切斷。
///
/// 結尾不完整的序列留到下一段；無效位元組以 U+FFFD 取代。
#[derive(Debug, Default)]
pub struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    pub fn new() -> Self {
        Utf8Chunker::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        // 序列被切斷，等下一段
                        None => {
                            self.pending.drain(..valid_up_to);
                            return text;
                        }
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                    }
                }
            }
        }
    }

    /// 串流結束時取出剩餘位元組
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_characters_are_not_split() {
        let bytes = "字型".as_bytes();
        let mut chunker = Utf8Chunker::new();
        assert_eq!(chunker.push(&bytes[..2]), "");
        assert_eq!(chunker.push(&bytes[2..4]), "字");
        assert_eq!(chunker.push(&bytes[4..]), "型");
        assert_eq!(chunker.finish(), None);
    }

    #[test]
    fn any_split_reassembles_the_original_text() {
        let text = "converting 常用字 3500 … done\n";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut chunker = Utf8Chunker::new();
            let mut out = chunker.push(&bytes[..split]);
            out.push_str(&chunker.push(&bytes[split..]));
            out.push_str(&chunker.finish().unwrap_or_default());
            assert_eq!(out, text, "split at {}", split);
        }
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut chunker = Utf8Chunker::new();
        assert_eq!(chunker.push(b"a\xffb"), "a\u{fffd}b");
    }

    #[test]
    fn truncated_tail_is_flushed_lossily() {
        let mut chunker = Utf8Chunker::new();
        assert_eq!(chunker.push(&"字".as_bytes()[..2]), "");
        assert_eq!(chunker.finish().as_deref(), Some("\u{fffd}"));
        assert_eq!(chunker.finish(), None);
    }
}
