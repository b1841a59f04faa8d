//! Minimal DER reader for the structures used by RSA and EC key encodings.

use crate::error::*;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

/// Tag of a constructed, context-specific `[n]` element.
pub const fn context_tag(n: u8) -> u8 {
    0xa0 | n
}

/// Reads consecutive DER elements from a byte slice.
///
/// Constructed elements return a nested reader over their contents. Every structural
/// problem is reported as `MalformedKeyEncoding`.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    data: &'a [u8],
}

impl<'a> DerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        DerReader { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.first().copied()
    }

    fn read_length(&mut self) -> Result<usize, Error> {
        let (&first, rest) = self
            .data
            .split_first()
            .ok_or(JWTError::MalformedKeyEncoding)?;
        self.data = rest;
        if first < 0x80 {
            return Ok(first as usize);
        }
        let count = (first & 0x7f) as usize;
        // Indefinite lengths are not DER, and 4 length bytes cover any key.
        ensure!(
            (1..=4).contains(&count) && self.data.len() >= count,
            JWTError::MalformedKeyEncoding
        );
        let (len_bytes, rest) = self.data.split_at(count);
        self.data = rest;
        Ok(len_bytes
            .iter()
            .fold(0usize, |len, &b| (len << 8) | b as usize))
    }

    /// Reads one element with the expected tag and returns its contents.
    pub fn read_element(&mut self, expected_tag: u8) -> Result<&'a [u8], Error> {
        let (&tag, rest) = self
            .data
            .split_first()
            .ok_or(JWTError::MalformedKeyEncoding)?;
        ensure!(tag == expected_tag, JWTError::MalformedKeyEncoding);
        self.data = rest;
        let len = self.read_length()?;
        ensure!(self.data.len() >= len, JWTError::MalformedKeyEncoding);
        let (contents, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(contents)
    }

    pub fn read_sequence(&mut self) -> Result<DerReader<'a>, Error> {
        self.read_element(TAG_SEQUENCE).map(DerReader::new)
    }

    /// Reads an explicitly tagged `[n]` element.
    pub fn read_context_specific(&mut self, n: u8) -> Result<DerReader<'a>, Error> {
        self.read_element(context_tag(n)).map(DerReader::new)
    }

    /// Reads an `[n]` element if it is the next one.
    pub fn read_optional_context_specific(
        &mut self,
        n: u8,
    ) -> Result<Option<DerReader<'a>>, Error> {
        if self.peek_tag() == Some(context_tag(n)) {
            self.read_context_specific(n).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Raw two's complement contents of an INTEGER.
    pub fn read_integer(&mut self) -> Result<&'a [u8], Error> {
        let contents = self.read_element(TAG_INTEGER)?;
        ensure!(!contents.is_empty(), JWTError::MalformedKeyEncoding);
        Ok(contents)
    }

    /// Magnitude of a non-negative INTEGER, without the sign byte DER adds
    /// when the high bit of the value is set.
    pub fn read_unsigned_integer(&mut self) -> Result<&'a [u8], Error> {
        let contents = self.read_integer()?;
        ensure!(contents[0] & 0x80 == 0, JWTError::MalformedKeyEncoding);
        match contents {
            [0, rest @ ..] if !rest.is_empty() => Ok(rest),
            _ => Ok(contents),
        }
    }

    /// Reads a small INTEGER such as a structure version.
    pub fn read_small_integer(&mut self) -> Result<u32, Error> {
        let contents = self.read_integer()?;
        ensure!(
            contents.len() <= 4 && contents[0] & 0x80 == 0,
            JWTError::MalformedKeyEncoding
        );
        Ok(contents
            .iter()
            .fold(0u32, |value, &b| (value << 8) | b as u32))
    }

    pub fn read_octet_string(&mut self) -> Result<&'a [u8], Error> {
        self.read_element(TAG_OCTET_STRING)
    }

    /// Contents of a BIT STRING, which must not have unused bits.
    pub fn read_bit_string(&mut self) -> Result<&'a [u8], Error> {
        let contents = self.read_element(TAG_BIT_STRING)?;
        match contents.split_first() {
            Some((0, bits)) => Ok(bits),
            _ => bail!(JWTError::MalformedKeyEncoding),
        }
    }

    /// Encoded contents of an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<&'a [u8], Error> {
        let contents = self.read_element(TAG_OID)?;
        ensure!(!contents.is_empty(), JWTError::MalformedKeyEncoding);
        Ok(contents)
    }

    pub fn read_null(&mut self) -> Result<(), Error> {
        let contents = self.read_element(TAG_NULL)?;
        ensure!(contents.is_empty(), JWTError::MalformedKeyEncoding);
        Ok(())
    }

    /// Fails if anything is left to read.
    pub fn finish(self) -> Result<(), Error> {
        ensure!(self.data.is_empty(), JWTError::MalformedKeyEncoding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_malformed(err: Error) -> bool {
        JWTError::kind_of(&err) == Some(&JWTError::MalformedKeyEncoding)
    }

    #[test]
    fn sequence_of_integers() {
        let der = [0x30, 0x08, 0x02, 0x01, 0x01, 0x02, 0x03, 0x00, 0x80, 0x01];
        let mut reader = DerReader::new(&der);
        let mut seq = reader.read_sequence().unwrap();
        assert_eq!(seq.read_small_integer().unwrap(), 1);
        assert_eq!(seq.read_unsigned_integer().unwrap(), &[0x80, 0x01]);
        seq.finish().unwrap();
        reader.finish().unwrap();
    }

    #[test]
    fn long_form_length() {
        let mut der = vec![0x04, 0x81, 0x90];
        der.extend_from_slice(&[0x5a; 0x90]);
        let mut reader = DerReader::new(&der);
        assert_eq!(reader.read_octet_string().unwrap().len(), 0x90);
        assert!(reader.is_empty());
    }

    #[test]
    fn truncated_and_indefinite() {
        assert!(is_malformed(
            DerReader::new(&[0x30, 0x05, 0x02, 0x01])
                .read_sequence()
                .unwrap_err()
        ));
        assert!(is_malformed(
            DerReader::new(&[0x30, 0x80, 0x00, 0x00])
                .read_sequence()
                .unwrap_err()
        ));
        assert!(is_malformed(DerReader::new(&[]).read_integer().unwrap_err()));
    }

    #[test]
    fn wrong_tag_and_trailing_bytes() {
        assert!(is_malformed(
            DerReader::new(&[0x04, 0x01, 0x00]).read_integer().unwrap_err()
        ));
        let mut reader = DerReader::new(&[0x05, 0x00, 0xff]);
        reader.read_null().unwrap();
        assert!(is_malformed(reader.finish().unwrap_err()));
    }

    #[test]
    fn negative_integer_is_rejected() {
        assert!(is_malformed(
            DerReader::new(&[0x02, 0x01, 0x80])
                .read_unsigned_integer()
                .unwrap_err()
        ));
    }

    #[test]
    fn bit_string_with_unused_bits() {
        assert_eq!(
            DerReader::new(&[0x03, 0x03, 0x00, 0x04, 0x01])
                .read_bit_string()
                .unwrap(),
            &[0x04, 0x01]
        );
        assert!(is_malformed(
            DerReader::new(&[0x03, 0x02, 0x01, 0x04])
                .read_bit_string()
                .unwrap_err()
        ));
    }

    #[test]
    fn optional_context_specific() {
        let der = [0xa1, 0x02, 0x05, 0x00];
        let mut reader = DerReader::new(&der);
        assert!(reader.read_optional_context_specific(0).unwrap().is_none());
        let mut inner = reader.read_optional_context_specific(1).unwrap().unwrap();
        inner.read_null().unwrap();
        inner.finish().unwrap();
        reader.finish().unwrap();
    }
}
