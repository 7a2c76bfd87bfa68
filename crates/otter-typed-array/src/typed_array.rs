//! TypedArray views
//!
//! TypedArrays are views over ArrayBuffer, providing typed access to binary data.
//! All 9 numeric kinds share one implementation via [`TypedArrayKind`].

use std::sync::Arc;

use crate::array_buffer::JsArrayBuffer;
use crate::object::JsObject;

/// The kind of TypedArray - determines element size and interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    /// Int8Array - 8-bit signed integers
    Int8,
    /// Uint8Array - 8-bit unsigned integers
    Uint8,
    /// Uint8ClampedArray - 8-bit unsigned integers (clamped)
    Uint8Clamped,
    /// Int16Array - 16-bit signed integers
    Int16,
    /// Uint16Array - 16-bit unsigned integers
    Uint16,
    /// Int32Array - 32-bit signed integers
    Int32,
    /// Uint32Array - 32-bit unsigned integers
    Uint32,
    /// Float32Array - 32-bit floating point
    Float32,
    /// Float64Array - 64-bit floating point
    Float64,
}

impl TypedArrayKind {
    /// Every kind, in intrinsic table order
    pub const ALL: [TypedArrayKind; 9] = [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
    ];

    /// Position of this kind in [`TypedArrayKind::ALL`]
    pub const fn table_index(self) -> usize {
        match self {
            TypedArrayKind::Int8 => 0,
            TypedArrayKind::Uint8 => 1,
            TypedArrayKind::Uint8Clamped => 2,
            TypedArrayKind::Int16 => 3,
            TypedArrayKind::Uint16 => 4,
            TypedArrayKind::Int32 => 5,
            TypedArrayKind::Uint32 => 6,
            TypedArrayKind::Float32 => 7,
            TypedArrayKind::Float64 => 8,
        }
    }

    /// Get the byte size of each element
    pub const fn element_size(self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 => 8,
        }
    }

    /// Get the name of this TypedArray type
    pub const fn name(self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
        }
    }

    /// Decode a little-endian element
    fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            TypedArrayKind::Int8 => bytes[0] as i8 as f64,
            TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => bytes[0] as f64,
            TypedArrayKind::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            TypedArrayKind::Uint16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            TypedArrayKind::Int32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            TypedArrayKind::Uint32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            TypedArrayKind::Float32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            TypedArrayKind::Float64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }

    /// Encode a number into little-endian element bytes, applying the
    /// kind's conversion (modular for integers, clamped for Uint8Clamped)
    fn encode(self, value: f64, bytes: &mut [u8]) {
        match self {
            TypedArrayKind::Int8 => bytes[0] = to_int8(value) as u8,
            TypedArrayKind::Uint8 => bytes[0] = to_uint8(value),
            TypedArrayKind::Uint8Clamped => bytes[0] = to_uint8_clamp(value),
            TypedArrayKind::Int16 => bytes[..2].copy_from_slice(&to_int16(value).to_le_bytes()),
            TypedArrayKind::Uint16 => bytes[..2].copy_from_slice(&to_uint16(value).to_le_bytes()),
            TypedArrayKind::Int32 => bytes[..4].copy_from_slice(&to_int32(value).to_le_bytes()),
            TypedArrayKind::Uint32 => bytes[..4].copy_from_slice(&to_uint32(value).to_le_bytes()),
            TypedArrayKind::Float32 => bytes[..4].copy_from_slice(&(value as f32).to_le_bytes()),
            TypedArrayKind::Float64 => bytes[..8].copy_from_slice(&value.to_le_bytes()),
        }
    }
}

// ---------------------------------------------------------------------------
// Element conversions
// ---------------------------------------------------------------------------

/// Truncate and reduce modulo 2^bits into `[0, 2^bits)`
fn modulo_bits(n: f64, bits: i32) -> f64 {
    if !n.is_finite() || n == 0.0 {
        return 0.0;
    }
    let modulus = 2f64.powi(bits);
    let r = n.trunc() % modulus;
    if r < 0.0 { r + modulus } else { r }
}

/// ToInt8
pub fn to_int8(n: f64) -> i8 {
    modulo_bits(n, 8) as u8 as i8
}

/// ToUint8
pub fn to_uint8(n: f64) -> u8 {
    modulo_bits(n, 8) as u8
}

/// ToUint8Clamp: clamp to [0, 255], ties round to even
pub fn to_uint8_clamp(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let floor = n.floor();
    let half = floor + 0.5;
    if n < half {
        floor as u8
    } else if n > half {
        floor as u8 + 1
    } else if floor % 2.0 == 0.0 {
        floor as u8
    } else {
        floor as u8 + 1
    }
}

/// ToInt16
pub fn to_int16(n: f64) -> i16 {
    modulo_bits(n, 16) as u16 as i16
}

/// ToUint16
pub fn to_uint16(n: f64) -> u16 {
    modulo_bits(n, 16) as u16
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    modulo_bits(n, 32) as u32 as i32
}

/// ToUint32
pub fn to_uint32(n: f64) -> u32 {
    modulo_bits(n, 32) as u32
}

/// A JavaScript TypedArray
///
/// A view over an ArrayBuffer. It does not copy data and does not own the
/// liveness of that data: every accessor consults the buffer first.
#[derive(Debug, Clone)]
pub struct JsTypedArray {
    /// The ArrayBuffer object this view reads through
    buffer: Arc<JsObject>,
    /// Backing store of `buffer`
    store: Arc<JsArrayBuffer>,
    /// Byte offset into the buffer
    byte_offset: usize,
    /// Number of elements (not bytes)
    length: usize,
    /// The kind of typed array
    kind: TypedArrayKind,
}

impl JsTypedArray {
    /// Create a new TypedArray view over an ArrayBuffer object
    pub fn new(
        buffer: Arc<JsObject>,
        kind: TypedArrayKind,
        byte_offset: usize,
        length: usize,
    ) -> Result<Self, &'static str> {
        let store = buffer
            .as_array_buffer()
            .cloned()
            .ok_or("view target is not an ArrayBuffer")?;
        let elem_size = kind.element_size();

        if byte_offset % elem_size != 0 {
            return Err("byte offset must be aligned to element size");
        }

        let byte_length = length
            .checked_mul(elem_size)
            .ok_or("TypedArray length overflow")?;
        let end = byte_offset
            .checked_add(byte_length)
            .ok_or("TypedArray length overflow")?;
        if end > store.byte_length() {
            return Err("TypedArray would extend past end of buffer");
        }

        Ok(Self {
            buffer,
            store,
            byte_offset,
            length,
            kind,
        })
    }

    /// Get the kind of this TypedArray
    pub fn kind(&self) -> TypedArrayKind {
        self.kind
    }

    /// Get the ArrayBuffer object
    pub fn buffer(&self) -> &Arc<JsObject> {
        &self.buffer
    }

    /// Get the backing store
    pub fn store(&self) -> &Arc<JsArrayBuffer> {
        &self.store
    }

    /// Get the byte offset into the buffer (0 if detached)
    pub fn byte_offset(&self) -> usize {
        if self.store.is_detached() {
            0
        } else {
            self.byte_offset
        }
    }

    /// Get the byte length of the view (0 if detached)
    pub fn byte_length(&self) -> usize {
        if self.store.is_detached() {
            0
        } else {
            self.length * self.kind.element_size()
        }
    }

    /// Get the number of elements (0 if detached)
    pub fn length(&self) -> usize {
        if self.store.is_detached() {
            0
        } else {
            self.length
        }
    }

    /// Check if the underlying buffer is detached
    pub fn is_detached(&self) -> bool {
        self.store.is_detached()
    }

    /// Whether `index` currently names an element
    pub fn is_valid_index(&self, index: usize) -> bool {
        !self.store.is_detached() && index < self.length
    }

    /// Read an element; None if detached or out of bounds
    pub fn get(&self, index: usize) -> Option<f64> {
        if index >= self.length {
            return None;
        }
        let size = self.kind.element_size();
        let byte_index = self.byte_offset + index * size;
        self.store
            .with_data(|data| self.kind.decode(&data[byte_index..byte_index + size]))
    }

    /// Write an element with the kind's conversion; false if detached or out of bounds
    pub fn set(&self, index: usize, value: f64) -> bool {
        if index >= self.length {
            return false;
        }
        let size = self.kind.element_size();
        let byte_index = self.byte_offset + index * size;
        self.store
            .with_data_mut(|data| self.kind.encode(value, &mut data[byte_index..byte_index + size]))
            .is_some()
    }

    /// Copy `count` elements starting at `start` as raw bytes
    pub fn read_elements_raw(&self, start: usize, count: usize) -> Option<Vec<u8>> {
        if start.checked_add(count)? > self.length {
            return None;
        }
        let size = self.kind.element_size();
        self.store
            .copy_range(self.byte_offset + start * size, count * size)
    }

    /// Overwrite elements starting at `start` with raw bytes
    pub fn write_elements_raw(&self, start: usize, bytes: &[u8]) -> bool {
        let size = self.kind.element_size();
        if bytes.len() % size != 0 || start + bytes.len() / size > self.length {
            return false;
        }
        self.store.write_bytes(self.byte_offset + start * size, bytes)
    }
}
