//! Big-endian byte codec for strokes and characters.
//!
//! Record layout (all integers big-endian):
//!
//! ```text
//! character := identity:u32 flags:u8 [legacy-string] stroke-count:u32 stroke*
//! stroke    := x:i32 y:i32 link-count:u32 (dx:i8 dy:i8)*
//! string    := byte-length:u32 utf16be*      (0xFFFF_FFFF = null)
//! ```
//!
//! The identity word keeps the symbol in its low 16 bits. Control keys are
//! written as their 16-bit legacy code in the high half and migrated back
//! to [`SpecialKey`] on decode.

use crate::character::{CharFlags, Character, Identity, SpecialKey};
use crate::error::{CodecError, CodecResult};
use crate::geometry::Point;
use crate::stroke::{GlyphLink, MAX_COORDINATE, MAX_LINKS, Stroke};

const NULL_STRING: u32 = 0xFFFF_FFFF;

/// Read cursor over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> CodecResult<i8> {
        Ok(i8::from_be_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    /// Read a length-prefixed UTF-16BE string. `None` for the null marker.
    pub fn read_string(&mut self) -> CodecResult<Option<String>> {
        let offset = self.pos;
        let len = self.read_u32()?;
        if len == NULL_STRING {
            return Ok(None);
        }
        if len % 2 != 0 {
            return Err(CodecError::InvalidString { offset });
        }
        let bytes = self.read_bytes(len as usize)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map(Some)
            .map_err(|_| CodecError::InvalidString { offset })
    }
}

/// Growable big-endian output buffer.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_string(&mut self, s: Option<&str>) {
        let Some(s) = s else {
            self.write_u32(NULL_STRING);
            return;
        };
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_u32((units.len() * 2) as u32);
        for unit in units {
            self.buf.extend_from_slice(&unit.to_be_bytes());
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Strokes
// ---------------------------------------------------------------------------

pub fn encode_stroke(stroke: &Stroke, w: &mut ByteWriter) {
    let start = stroke.start_point();
    w.write_i32(start.x);
    w.write_i32(start.y);
    w.write_u32(stroke.len() as u32);
    for link in stroke.links() {
        w.write_i8(link.dx);
        w.write_i8(link.dy);
    }
}

pub fn decode_stroke(r: &mut ByteReader<'_>) -> CodecResult<Stroke> {
    let x = r.read_i32()?;
    let y = r.read_i32()?;
    let limit = -MAX_COORDINATE..=MAX_COORDINATE;
    if !limit.contains(&x) || !limit.contains(&y) {
        return Err(CodecError::CoordinateOutOfRange {
            x,
            y,
            max: MAX_COORDINATE,
        });
    }
    let count = r.read_u32()? as usize;
    if count > MAX_LINKS {
        return Err(CodecError::TooManyLinks {
            count,
            max: MAX_LINKS,
        });
    }
    let mut links = Vec::with_capacity(count);
    for _ in 0..count {
        let dx = r.read_i8()?;
        let dy = r.read_i8()?;
        links.push(GlyphLink::new(dx, dy));
    }
    Ok(Stroke::from_links(Point::new(x, y), links))
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

/// Pack an identity into the on-disk word.
pub fn identity_word(identity: Identity) -> CodecResult<u32> {
    match identity {
        Identity::None => Ok(0),
        Identity::Symbol(c) => {
            let code = u32::from(c);
            if code > 0xFFFF {
                return Err(CodecError::SymbolOutOfRange { symbol: c });
            }
            Ok(code)
        }
        Identity::Control(key) => Ok(key.legacy_code() << 16),
    }
}

/// Unpack an identity word, migrating legacy 16-bit key codes.
///
/// A recognized key in the high half wins over the symbol in the low half;
/// an unrecognized one is ignored.
pub fn identity_from_word(word: u32) -> CodecResult<Identity> {
    if let Some(key) = SpecialKey::from_legacy_code(word >> 16) {
        return Ok(Identity::Control(key));
    }
    let low = word & 0xFFFF;
    if low == 0 {
        return Ok(Identity::None);
    }
    char::from_u32(low)
        .map(Identity::Symbol)
        .ok_or(CodecError::InvalidSymbol { word })
}

pub fn encode_character(ch: &Character, w: &mut ByteWriter) -> CodecResult<()> {
    w.write_u32(identity_word(ch.identity())?);
    w.write_u8((ch.flags() - CharFlags::DATA).bits());
    w.write_u32(ch.stroke_count() as u32);
    for stroke in ch.strokes() {
        encode_stroke(stroke, w);
    }
    Ok(())
}

pub fn decode_character(r: &mut ByteReader<'_>) -> CodecResult<Character> {
    let mut ch = Character::new();
    ch.set_identity(identity_from_word(r.read_u32()?)?);

    let mut flags = CharFlags::from_bits_retain(r.read_u8()?);
    if flags.contains(CharFlags::DATA) {
        // Legacy payload, read and dropped.
        r.read_string()?;
        flags.remove(CharFlags::DATA);
    }
    ch.set_flags(flags);

    let count = r.read_u32()?;
    for _ in 0..count {
        ch.add_stroke(decode_stroke(r)?);
    }
    Ok(ch)
}

/// Encode a single character into a fresh buffer.
pub fn character_to_bytes(ch: &Character) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    encode_character(ch, &mut w)?;
    Ok(w.into_inner())
}

/// Decode a single character from the start of `bytes`.
pub fn character_from_bytes(bytes: &[u8]) -> CodecResult<Character> {
    decode_character(&mut ByteReader::new(bytes))
}
