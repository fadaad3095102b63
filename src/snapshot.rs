//! Binary snapshot container.
//!
//! A snapshot captures a compiled program graph plus optionally the
//! input values it was invoked with and the output value it produced.
//! Layout: a fixed header (magic, version, counts, section offsets),
//! then the JSON-encoded program, then one value record per recorded
//! argument, then an optional expected-result record. All section
//! offsets are ascending and 8-aligned; integers are little-endian.
//!
//! The reader is mmap-backed and lazy: argument and result records keep
//! a mapped byte range and decode on demand, so a malformed record
//! surfaces when the value is actually needed rather than at load time.

use std::fs;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use memmap2::Mmap;

use crate::graph::ProgramGraph;
use crate::shape::Shape;
use crate::tensor::{DType, TensorValue};

const MAGIC: &[u8; 5] = b"SNAP\0";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 57;

/// A slice into a memory-mapped snapshot file.
#[derive(Debug, Clone)]
pub struct MappedSlice {
    mmap: Arc<Mmap>,
    range: Range<usize>,
}

impl MappedSlice {
    fn new(mmap: Arc<Mmap>, range: Range<usize>) -> Self {
        Self { mmap, range }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[self.range.clone()]
    }
}

/// A recorded value: declared dtype and dims plus the mapped raw bytes.
/// Decoding validates that the bytes match the declared shape.
#[derive(Debug, Clone)]
pub struct RecordedValue {
    dtype: DType,
    dims: Vec<usize>,
    data: MappedSlice,
}

impl RecordedValue {
    pub fn shape(&self) -> Shape {
        Shape::new(self.dtype, self.dims.clone())
    }

    pub fn decode(&self) -> Result<TensorValue> {
        TensorValue::from_bytes(self.dtype, &self.dims, self.data.as_bytes())
    }
}

/// In-memory snapshot record. Immutable once loaded; owned exclusively
/// by the replay invocation that loaded it.
#[derive(Debug)]
pub struct Snapshot {
    pub program: ProgramGraph,
    pub arguments: Vec<RecordedValue>,
    pub result: Option<RecordedValue>,
}

impl Snapshot {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| "open snapshot file")?;
        let mmap = unsafe { Mmap::map(&file).with_context(|| "mmap snapshot file")? };
        let data = &mmap[..];
        if data.len() < HEADER_SIZE {
            return Err(anyhow!("file too small for SNAP header"));
        }

        let mut cursor = 0usize;
        let magic = read_bytes(data, &mut cursor, 5)?;
        if magic != MAGIC {
            return Err(anyhow!("invalid SNAP magic"));
        }
        let version = read_u32(data, &mut cursor)?;
        if version != VERSION {
            return Err(anyhow!("unsupported SNAP version {}", version));
        }
        let n_arguments = read_u32(data, &mut cursor)? as usize;
        let flags = read_u32(data, &mut cursor)?;
        let has_result = (flags & 1) != 0;
        let offset_program = read_u64(data, &mut cursor)? as usize;
        let program_nbytes = read_u64(data, &mut cursor)? as usize;
        let offset_arguments = read_u64(data, &mut cursor)? as usize;
        let offset_result = read_u64(data, &mut cursor)? as usize;
        let file_size = read_u64(data, &mut cursor)? as usize;

        if file_size != data.len() {
            return Err(anyhow!("file size mismatch"));
        }
        let offsets = [
            offset_program,
            offset_arguments,
            offset_result,
            file_size,
        ];
        let mut sorted = offsets;
        sorted.sort_unstable();
        if offsets != sorted {
            return Err(anyhow!("SNAP offsets are not ascending"));
        }
        for off in offsets.iter().take(3) {
            if *off % 8 != 0 {
                return Err(anyhow!("SNAP section offset not aligned"));
            }
            if *off > file_size {
                return Err(anyhow!("SNAP section offset out of bounds"));
            }
        }
        if offset_program + program_nbytes > file_size {
            return Err(anyhow!("program section out of bounds"));
        }

        let program_bytes = &data[offset_program..offset_program + program_nbytes];
        let program_json: serde_json::Value =
            serde_json::from_slice(program_bytes).with_context(|| "parse program section")?;
        let program = ProgramGraph::from_json(program_json)?;

        let mmap = Arc::new(mmap);
        let mut arguments = Vec::with_capacity(n_arguments);
        let mut record_cursor = offset_arguments;
        for _ in 0..n_arguments {
            arguments.push(read_record(&mmap, &mut record_cursor, file_size)?);
        }
        let result = if has_result {
            let mut result_cursor = offset_result;
            Some(read_record(&mmap, &mut result_cursor, file_size)?)
        } else {
            None
        };

        Ok(Self {
            program,
            arguments,
            result,
        })
    }

    /// Serialize a snapshot to disk. `read` of the produced file yields
    /// a snapshot whose records decode to the given values exactly.
    pub fn write(
        path: impl AsRef<Path>,
        program: &ProgramGraph,
        arguments: &[TensorValue],
        result: Option<&TensorValue>,
    ) -> Result<()> {
        let program_bytes = serde_json::to_vec(&program.to_json()?)?;

        let offset_program = align_up(HEADER_SIZE, 8);
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        push_u32(&mut out, VERSION);
        push_u32(&mut out, arguments.len() as u32);
        push_u32(&mut out, if result.is_some() { 1 } else { 0 });

        // Offsets are back-patched once the section layout is known.
        let offset_fields = out.len();
        for _ in 0..5 {
            push_u64(&mut out, 0);
        }
        debug_assert_eq!(out.len(), HEADER_SIZE);
        pad_to(&mut out, offset_program);

        out.extend_from_slice(&program_bytes);
        let offset_arguments = align_up(out.len(), 8);
        pad_to(&mut out, offset_arguments);
        for value in arguments {
            write_record(&mut out, value);
        }
        let offset_result = align_up(out.len(), 8);
        pad_to(&mut out, offset_result);
        if let Some(value) = result {
            write_record(&mut out, value);
        }
        let file_size = out.len();

        patch_u64(&mut out, offset_fields, offset_program as u64);
        patch_u64(&mut out, offset_fields + 8, program_bytes.len() as u64);
        patch_u64(&mut out, offset_fields + 16, offset_arguments as u64);
        patch_u64(&mut out, offset_fields + 24, offset_result as u64);
        patch_u64(&mut out, offset_fields + 32, file_size as u64);

        fs::write(path, out).with_context(|| "write snapshot file")?;
        Ok(())
    }
}

fn read_record(mmap: &Arc<Mmap>, cursor: &mut usize, file_size: usize) -> Result<RecordedValue> {
    let data = &mmap[..];
    let dtype_raw = read_u32(data, cursor)?;
    let ndim = read_u32(data, cursor)? as usize;
    let mut dims = Vec::with_capacity(ndim);
    for _ in 0..ndim {
        dims.push(read_u64(data, cursor)? as usize);
    }
    let nbytes = read_u64(data, cursor)? as usize;
    let dtype = ValueType::to_dtype(dtype_raw)?;
    let start = *cursor;
    let end = start
        .checked_add(nbytes)
        .ok_or_else(|| anyhow!("record data length overflow"))?;
    if end > file_size {
        return Err(anyhow!("record data out of bounds"));
    }
    *cursor = align_up(end, 8);
    Ok(RecordedValue {
        dtype,
        dims,
        data: MappedSlice::new(mmap.clone(), start..end),
    })
}

fn write_record(out: &mut Vec<u8>, value: &TensorValue) {
    let bytes = value.to_bytes();
    push_u32(out, ValueType::from_dtype(value.dtype()));
    push_u32(out, value.shape().len() as u32);
    for dim in value.shape() {
        push_u64(out, *dim as u64);
    }
    push_u64(out, bytes.len() as u64);
    out.extend_from_slice(&bytes);
    let padded = align_up(out.len(), 8);
    pad_to(out, padded);
}

fn read_bytes<'a>(data: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    if *cursor + len > data.len() {
        return Err(anyhow!("unexpected EOF"));
    }
    let out = &data[*cursor..*cursor + len];
    *cursor += len;
    Ok(out)
}

fn read_u32(data: &[u8], cursor: &mut usize) -> Result<u32> {
    let bytes = read_bytes(data, cursor, 4)?;
    Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
}

fn read_u64(data: &[u8], cursor: &mut usize) -> Result<u64> {
    let bytes = read_bytes(data, cursor, 8)?;
    Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn patch_u64(out: &mut [u8], offset: usize, value: u64) {
    out[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn pad_to(out: &mut Vec<u8>, target: usize) {
    while out.len() < target {
        out.push(0);
    }
}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) / alignment * alignment
}

struct ValueType;

impl ValueType {
    const I8: u32 = 1;
    const I16: u32 = 2;
    const I32: u32 = 3;
    const I64: u32 = 4;
    const U8: u32 = 5;
    const U16: u32 = 6;
    const U32: u32 = 7;
    const U64: u32 = 8;
    const F32: u32 = 9;
    const F64: u32 = 10;
    const BOOL: u32 = 11;

    fn from_dtype(dtype: DType) -> u32 {
        match dtype {
            DType::I8 => Self::I8,
            DType::I16 => Self::I16,
            DType::I32 => Self::I32,
            DType::I64 => Self::I64,
            DType::U8 => Self::U8,
            DType::U16 => Self::U16,
            DType::U32 => Self::U32,
            DType::U64 => Self::U64,
            DType::F32 => Self::F32,
            DType::F64 => Self::F64,
            DType::Bool => Self::BOOL,
        }
    }

    fn to_dtype(value_type: u32) -> Result<DType> {
        Ok(match value_type {
            Self::I8 => DType::I8,
            Self::I16 => DType::I16,
            Self::I32 => DType::I32,
            Self::I64 => DType::I64,
            Self::U8 => DType::U8,
            Self::U16 => DType::U16,
            Self::U32 => DType::U32,
            Self::U64 => DType::U64,
            Self::F32 => DType::F32,
            Self::F64 => DType::F64,
            Self::BOOL => DType::Bool,
            _ => return Err(anyhow!("unknown record dtype {}", value_type)),
        })
    }
}
