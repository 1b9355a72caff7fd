use std::io::{Read, Result as IOResult, Seek, SeekFrom};

pub trait RawDataRead {
  fn read_data(&mut self, len: usize) -> IOResult<Box<[u8]>>;
  fn read_data_exact(&mut self, len: usize) -> IOResult<Box<[u8]>>;
}

impl<T: Read + ?Sized> RawDataRead for T {
  fn read_data_exact(&mut self, len: usize) -> IOResult<Box<[u8]>> {
    let mut buffer = vec![0u8; len];
    self.read_exact(&mut buffer)?;
    Ok(buffer.into_boxed_slice())
  }

  fn read_data(&mut self, len: usize) -> IOResult<Box<[u8]>> {
    let mut buffer = vec![0u8; len];

    let mut read_offset = 0;
    let mut bytes_read = usize::MAX;
    while read_offset < buffer.len() && bytes_read != 0 {
      bytes_read = self.read(&mut buffer[read_offset..])?;
      read_offset += bytes_read;
    }

    buffer.truncate(read_offset);
    Ok(buffer.into_boxed_slice())
  }
}

pub trait ReadEntireSeekableStream {
  fn read_seekable_to_end(&mut self) -> IOResult<Box<[u8]>>;
}

// The standard library read_to_end function does a lot of small reads because it can't rely on Seek.
impl<T: RawDataRead + Seek + ?Sized> ReadEntireSeekableStream for T {
  fn read_seekable_to_end(&mut self) -> IOResult<Box<[u8]>> {
    let len = self.seek(SeekFrom::End(0))? as usize;
    let _ = self.seek(SeekFrom::Start(0))?;
    self.read_data_exact(len)
  }
}

pub trait PrimitiveRead {
  fn read_u8(&mut self) -> IOResult<u8>;
  fn read_u16(&mut self) -> IOResult<u16>;
  fn read_u32(&mut self) -> IOResult<u32>;
  fn read_u64(&mut self) -> IOResult<u64>;
  fn read_i8(&mut self) -> IOResult<i8>;
  fn read_i16(&mut self) -> IOResult<i16>;
  fn read_i32(&mut self) -> IOResult<i32>;
  fn read_i64(&mut self) -> IOResult<i64>;
  fn read_f32(&mut self) -> IOResult<f32>;
  fn read_f64(&mut self) -> IOResult<f64>;
}

impl<T: Read + ?Sized> PrimitiveRead for T {
  fn read_u8(&mut self) -> IOResult<u8> {
    let mut buffer = [0u8; 1];
    self.read_exact(&mut buffer)?;
    Ok(u8::from_le_bytes(buffer))
  }

  fn read_u16(&mut self) -> IOResult<u16> {
    let mut buffer = [0u8; 2];
    self.read_exact(&mut buffer)?;
    Ok(u16::from_le_bytes(buffer))
  }

  fn read_u32(&mut self) -> IOResult<u32> {
    let mut buffer = [0u8; 4];
    self.read_exact(&mut buffer)?;
    Ok(u32::from_le_bytes(buffer))
  }

  fn read_u64(&mut self) -> IOResult<u64> {
    let mut buffer = [0u8; 8];
    self.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
  }

  fn read_i8(&mut self) -> IOResult<i8> {
    let mut buffer = [0u8; 1];
    self.read_exact(&mut buffer)?;
    Ok(i8::from_le_bytes(buffer))
  }

  fn read_i16(&mut self) -> IOResult<i16> {
    let mut buffer = [0u8; 2];
    self.read_exact(&mut buffer)?;
    Ok(i16::from_le_bytes(buffer))
  }

  fn read_i32(&mut self) -> IOResult<i32> {
    let mut buffer = [0u8; 4];
    self.read_exact(&mut buffer)?;
    Ok(i32::from_le_bytes(buffer))
  }

  fn read_i64(&mut self) -> IOResult<i64> {
    let mut buffer = [0u8; 8];
    self.read_exact(&mut buffer)?;
    Ok(i64::from_le_bytes(buffer))
  }

  fn read_f32(&mut self) -> IOResult<f32> {
    let mut buffer = [0u8; 4];
    self.read_exact(&mut buffer)?;
    Ok(f32::from_le_bytes(buffer))
  }

  fn read_f64(&mut self) -> IOResult<f64> {
    let mut buffer = [0u8; 8];
    self.read_exact(&mut buffer)?;
    Ok(f64::from_le_bytes(buffer))
  }
}
