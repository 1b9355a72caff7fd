use std::io::{Result as IOResult, Write};

pub trait PrimitiveWrite {
  fn write_u8(&mut self, value: u8) -> IOResult<()>;
  fn write_u16(&mut self, value: u16) -> IOResult<()>;
  fn write_u32(&mut self, value: u32) -> IOResult<()>;
  fn write_u64(&mut self, value: u64) -> IOResult<()>;
  fn write_i8(&mut self, value: i8) -> IOResult<()>;
  fn write_i16(&mut self, value: i16) -> IOResult<()>;
  fn write_i32(&mut self, value: i32) -> IOResult<()>;
  fn write_i64(&mut self, value: i64) -> IOResult<()>;
  fn write_f32(&mut self, value: f32) -> IOResult<()>;
  fn write_f64(&mut self, value: f64) -> IOResult<()>;
}

impl<T: Write + ?Sized> PrimitiveWrite for T {
  fn write_u8(&mut self, value: u8) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_u16(&mut self, value: u16) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_u32(&mut self, value: u32) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_u64(&mut self, value: u64) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_i8(&mut self, value: i8) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_i16(&mut self, value: i16) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_i32(&mut self, value: i32) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_i64(&mut self, value: i64) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_f32(&mut self, value: f32) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_f64(&mut self, value: f64) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::PrimitiveRead;
  use std::io::Cursor;

  #[test]
  fn write_read_roundtrip() {
    let mut buffer = Vec::new();
    buffer.write_u32(0xDEADBEEF).unwrap();
    buffer.write_i16(-2).unwrap();
    buffer.write_f32(0.5).unwrap();

    let mut cursor = Cursor::new(&buffer[..]);
    assert_eq!(cursor.read_u32().unwrap(), 0xDEADBEEF);
    assert_eq!(cursor.read_i16().unwrap(), -2);
    assert_eq!(cursor.read_f32().unwrap(), 0.5);
  }
}
