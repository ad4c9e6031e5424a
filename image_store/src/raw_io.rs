//! Raw 16-bit frame files: little-endian u16 samples in row-major order, no header.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use ndarray::{Array2, ArrayView2};
use crate::error::StoreError;

pub const APPEND_RAW_EXT:&str = "bin";

fn frame_bytes(frame:ArrayView2<u16>) -> Vec<u8> {
    let samples:Vec<u16> = frame.iter().copied().collect();
    let mut byte_buff:Vec<u8> = vec![0;2*samples.len()];
    LittleEndian::write_u16_into(&samples,&mut byte_buff);
    byte_buff
}

fn bytes_to_frame(bytes:&[u8],shape:[usize;2]) -> Array2<u16> {
    let mut samples:Vec<u16> = vec![0;shape[0]*shape[1]];
    LittleEndian::read_u16_into(bytes,&mut samples);
    Array2::from_shape_vec((shape[0],shape[1]),samples).expect("sample count matches the frame shape")
}

pub fn write_frame(path:&Path,frame:ArrayView2<u16>) -> Result<(),StoreError> {
    let mut f = File::create(path)?;
    f.write_all(&frame_bytes(frame))?;
    Ok(())
}

/// Reads one frame file. A file with the wrong byte count (e.g. cut short by an interrupted
/// run) yields `None`.
pub fn read_frame(path:&Path,shape:[usize;2]) -> Result<Option<Array2<u16>>,StoreError> {
    let mut f = File::open(path)?;
    let mut buf = Vec::<u8>::new();
    f.read_to_end(&mut buf)?;
    let expected = 2*shape[0]*shape[1];
    if buf.len() != expected {
        warn!("frame file {:?} holds {} bytes, expected {}; skipping",path,buf.len(),expected);
        return Ok(None)
    }
    Ok(Some(bytes_to_frame(&buf,shape)))
}

/// Writes a frame into the single append-raw file at slot `slot` (0-based counter).
pub fn write_frame_at(path:&Path,slot:usize,frame:ArrayView2<u16>) -> Result<(),StoreError> {
    let bytes = frame_bytes(frame);
    let offset = (slot*bytes.len()) as u64;
    let mut f = OpenOptions::new().create(true).write(true).open(path)?;
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(&bytes)?;
    Ok(())
}

/// Reads slot `slot` from an append-raw file; `None` when the file ends before the slot does.
pub fn read_frame_at(path:&Path,slot:usize,shape:[usize;2]) -> Result<Option<Array2<u16>>,StoreError> {
    let frame_size = 2*shape[0]*shape[1];
    let offset = (slot*frame_size) as u64;
    let mut f = File::open(path)?;
    let len = f.metadata()?.len();
    if offset + frame_size as u64 > len {
        return Ok(None)
    }
    f.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8;frame_size];
    f.read_exact(&mut buf)?;
    Ok(Some(bytes_to_frame(&buf,shape)))
}
