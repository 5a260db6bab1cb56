// crates/scanguard-engine/src/qoi.rs
//
// QOI stream format: 14-byte header, a sequence of pixel chunks, and an
// 8-byte end marker. Chunks are decoded one pixel at a time so the session
// can hand out rows incrementally.

use crate::error::Message;

/// Size of the fixed header.
pub const HEADER_LEN: usize = 14;
/// Stream magic.
pub const MAGIC: [u8; 4] = *b"qoif";
/// Trailing end marker.
pub const END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];
/// Largest accepted image, in pixels.
pub const MAX_PIXELS: u64 = 400_000_000;

const OP_INDEX: u8 = 0x00;
const OP_DIFF: u8 = 0x40;
const OP_LUMA: u8 = 0x80;
const OP_RUN: u8 = 0xc0;
const OP_RGB: u8 = 0xfe;
const OP_RGBA: u8 = 0xff;
const MASK_2: u8 = 0xc0;

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub colorspace: u8,
}

impl Header {
    pub(crate) fn parse(data: &[u8]) -> Result<Header, Message> {
        if data.is_empty() {
            return Err(Message::EmptyInput);
        }
        if let Some(magic) = data.get(..4) {
            if magic != MAGIC {
                return Err(Message::BadMagic {
                    found: [magic[0], magic[1], magic[2], magic[3]],
                });
            }
        }
        let Some(bytes) = data.get(..HEADER_LEN) else {
            return Err(Message::TruncatedHeader {
                available: data.len(),
            });
        };

        let width = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let height = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let channels = bytes[12];
        let colorspace = bytes[13];

        if !matches!(channels, 3 | 4) {
            return Err(Message::BadChannels(channels));
        }
        if colorspace > 1 {
            return Err(Message::BadColorSpace(colorspace));
        }
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(Message::ImageTooLarge { width, height });
        }

        Ok(Header {
            width,
            height,
            channels,
            colorspace,
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// RGBA pixel.
pub(crate) type Pixel = [u8; 4];

fn hash(px: Pixel) -> usize {
    let [r, g, b, a] = px;
    (usize::from(r) * 3 + usize::from(g) * 5 + usize::from(b) * 7 + usize::from(a) * 11) % 64
}

/// Chunk decoding cursor.
#[derive(Debug, Clone)]
pub(crate) struct ChunkStream {
    index: [Pixel; 64],
    px: Pixel,
    run: u8,
    pos: usize,
    /// Chunks are never read at or past this offset.
    end: usize,
}

impl ChunkStream {
    pub(crate) fn new(data: &[u8]) -> Self {
        let end = if data.len() >= HEADER_LEN + END_MARKER.len() && data.ends_with(&END_MARKER) {
            data.len() - END_MARKER.len()
        } else {
            data.len()
        };
        ChunkStream {
            index: [[0; 4]; 64],
            px: [0, 0, 0, 255],
            run: 0,
            pos: HEADER_LEN,
            end,
        }
    }

    /// Byte offset of the next unread chunk.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Pixels still owed by a run chunk.
    pub(crate) fn pending_run(&self) -> u8 {
        self.run
    }

    fn byte(&mut self, data: &[u8]) -> Option<u8> {
        if self.pos >= self.end {
            return None;
        }
        let b = *data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Decode the next pixel, or `None` when the chunk data runs out.
    pub(crate) fn next_pixel(&mut self, data: &[u8]) -> Option<Pixel> {
        if self.run > 0 {
            self.run -= 1;
            return Some(self.px);
        }

        let op = self.byte(data)?;
        match op {
            OP_RGB => {
                self.px[0] = self.byte(data)?;
                self.px[1] = self.byte(data)?;
                self.px[2] = self.byte(data)?;
            }
            OP_RGBA => {
                self.px[0] = self.byte(data)?;
                self.px[1] = self.byte(data)?;
                self.px[2] = self.byte(data)?;
                self.px[3] = self.byte(data)?;
            }
            _ => match op & MASK_2 {
                OP_INDEX => self.px = self.index[usize::from(op & 0x3f)],
                OP_DIFF => {
                    self.px[0] = self.px[0].wrapping_add(((op >> 4) & 0x03).wrapping_sub(2));
                    self.px[1] = self.px[1].wrapping_add(((op >> 2) & 0x03).wrapping_sub(2));
                    self.px[2] = self.px[2].wrapping_add((op & 0x03).wrapping_sub(2));
                }
                OP_LUMA => {
                    let second = self.byte(data)?;
                    let vg = (op & 0x3f).wrapping_sub(32);
                    self.px[0] = self.px[0]
                        .wrapping_add(vg.wrapping_sub(8).wrapping_add((second >> 4) & 0x0f));
                    self.px[1] = self.px[1].wrapping_add(vg);
                    self.px[2] = self.px[2]
                        .wrapping_add(vg.wrapping_sub(8).wrapping_add(second & 0x0f));
                }
                // OP_RUN: the current pixel now, `run` more later.
                _ => self.run = op & 0x3f,
            },
        }

        self.index[hash(self.px)] = self.px;
        Some(self.px)
    }
}
