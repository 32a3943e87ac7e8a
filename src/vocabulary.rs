//!
//! The Vocabulary module contains the append-only text arena that holds the name of every
//! record in a table
//!

/// An append-only arena of NUL-terminated names.
///
/// Offset 0 always holds an empty string, which is the name of the sentinel record 0.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    bytes : Vec<u8>,
}

impl Vocabulary {

    pub fn new(capacity : usize) -> Self {
        let mut bytes = Vec::with_capacity(capacity.max(1));
        bytes.push(0);
        Self{ bytes }
    }

    /// Wraps bytes read back from storage.  Returns `None` if they can't be a vocabulary
    pub fn from_bytes(bytes : Vec<u8>) -> Option<Self> {
        if bytes.first() != Some(&0) || bytes.last() != Some(&0) || std::str::from_utf8(&bytes).is_err() {
            return None;
        }
        Some(Self{ bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the vocabulary holds nothing beyond the sentinel's empty name
    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 1
    }

    /// Appends a name and returns the offset where it begins.
    ///
    /// The caller is responsible for checking the size ceiling and for having cleaned the name
    pub fn append(&mut self, text : &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        offset
    }

    /// Returns the name beginning at `offset`.
    ///
    /// Returns `None` if the offset lies outside the arena, which callers treat as corruption
    pub fn text_at(&self, offset : u32) -> Option<&str> {
        let tail = self.bytes.get(offset as usize..)?;
        let end = tail.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&tail[..end]).ok()
    }

    /// Overwrites the name at `offset` in place if `text` fits in the bytes it occupies,
    /// otherwise appends `text` and zeroes the old bytes.  Returns the offset of the new text
    pub fn rename(&mut self, offset : u32, text : &str) -> u32 {
        let old_len = self.text_len(offset);
        if text.len() <= old_len {
            let start = offset as usize;
            self.bytes[start..start + text.len()].copy_from_slice(text.as_bytes());
            //Zero the rest so the bytes after the terminator can't be mistaken for valid utf-8 tails
            for b in &mut self.bytes[start + text.len()..start + old_len] {
                *b = 0;
            }
            offset
        } else {
            self.blank(offset);
            self.append(text)
        }
    }

    /// Zeroes every byte of the name at `offset`
    pub fn blank(&mut self, offset : u32) {
        let start = offset as usize;
        let len = self.text_len(offset);
        for b in &mut self.bytes[start..start + len] {
            *b = 0;
        }
    }

    /// Zeroes only the first byte of the name at `offset`, making it read back empty
    pub fn zero_first_byte(&mut self, offset : u32) {
        if let Some(b) = self.bytes.get_mut(offset as usize) {
            *b = 0;
        }
    }

    fn text_len(&self, offset : u32) -> usize {
        match self.bytes.get(offset as usize..) {
            Some(tail) => tail.iter().position(|&b| b == 0).unwrap_or(tail.len()),
            None => 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read() {
        let mut voc = Vocabulary::new(16);
        assert!(voc.is_empty());
        assert_eq!(voc.text_at(0), Some(""));

        let a = voc.append("unc-22");
        let b = voc.append("AC3");
        assert_eq!(a, 1);
        assert_eq!(voc.text_at(a), Some("unc-22"));
        assert_eq!(voc.text_at(b), Some("AC3"));
        assert_eq!(voc.len(), 1 + 7 + 4);
        assert!(voc.text_at(1000).is_none());
    }

    #[test]
    fn rename_in_place_and_relocated() {
        let mut voc = Vocabulary::new(16);
        let a = voc.append("abcdef");
        let b = voc.append("xyz");

        //Shorter text stays put
        assert_eq!(voc.rename(a, "abc"), a);
        assert_eq!(voc.text_at(a), Some("abc"));
        assert_eq!(voc.text_at(b), Some("xyz"));

        //Longer text moves to the end and the old bytes read back empty
        let moved = voc.rename(b, "xyz-longer");
        assert_ne!(moved, b);
        assert_eq!(voc.text_at(b), Some(""));
        assert_eq!(voc.text_at(moved), Some("xyz-longer"));
    }

    #[test]
    fn blanking() {
        let mut voc = Vocabulary::new(16);
        let a = voc.append("gene");
        voc.zero_first_byte(a);
        assert_eq!(voc.text_at(a), Some(""));

        let b = voc.append("clone");
        voc.blank(b);
        assert_eq!(voc.text_at(b), Some(""));
        assert_eq!(voc.text_at(b + 1), Some(""));
    }

    #[test]
    fn from_bytes_validates() {
        assert!(Vocabulary::from_bytes(vec![]).is_none());
        assert!(Vocabulary::from_bytes(b"abc\0".to_vec()).is_none());
        assert!(Vocabulary::from_bytes(b"\0abc".to_vec()).is_none());
        let voc = Vocabulary::from_bytes(b"\0abc\0".to_vec()).unwrap();
        assert_eq!(voc.text_at(1), Some("abc"));
    }
}
