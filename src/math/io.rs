//! Little-endian primitives for the model format, and the tensor encoding:
//! `i32` rank, `rank x i32` shape, `i32` element count, `count x f64` data.

use std::io::{Read, Write};

use crate::error::{NnError, NnResult};

use super::tensor::Tensor;

pub(crate) fn write_u8<W: Write + ?Sized>(w: &mut W, value: u8) -> NnResult<()> {
    w.write_all(&[value])?;
    Ok(())
}

pub(crate) fn write_i32<W: Write + ?Sized>(w: &mut W, value: i32) -> NnResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_f64<W: Write + ?Sized>(w: &mut W, value: f64) -> NnResult<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_len<W: Write + ?Sized>(w: &mut W, value: usize, what: &str) -> NnResult<()> {
    let value = i32::try_from(value)
        .map_err(|_| NnError::format(format!("{what} {value} does not fit in an i32")))?;
    write_i32(w, value)
}

pub(crate) fn read_u8<R: Read + ?Sized>(r: &mut R) -> NnResult<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_i32<R: Read + ?Sized>(r: &mut R) -> NnResult<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_f64<R: Read + ?Sized>(r: &mut R) -> NnResult<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Reads an `i32` that must be non-negative.
pub(crate) fn read_len<R: Read + ?Sized>(r: &mut R, what: &str) -> NnResult<usize> {
    let value = read_i32(r)?;
    usize::try_from(value).map_err(|_| NnError::format(format!("negative {what}: {value}")))
}

impl Tensor {
    /// Writes this tensor in the model format. Strides are not stored.
    pub fn save<W: Write + ?Sized>(&self, w: &mut W) -> NnResult<()> {
        write_len(w, self.dims(), "tensor rank")?;
        for &dim in self.shape() {
            write_len(w, dim, "tensor dimension")?;
        }
        write_len(w, self.len(), "tensor element count")?;
        for &value in self.data() {
            write_f64(w, value)?;
        }
        Ok(())
    }

    /// Reads a tensor written by [`Tensor::save`].
    pub fn load<R: Read + ?Sized>(r: &mut R) -> NnResult<Tensor> {
        let dims = read_len(r, "tensor rank")?;
        let mut shape = Vec::with_capacity(dims.min(16));
        for _ in 0..dims {
            shape.push(read_len(r, "tensor dimension")?);
        }

        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| NnError::format(format!("tensor shape {shape:?} overflows")))?;
        let count = read_len(r, "tensor element count")?;
        if count != expected {
            return Err(NnError::format(format!(
                "tensor declares {count} elements but shape {shape:?} holds {expected}"
            )));
        }

        let mut data = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            data.push(read_f64(r)?);
        }
        Ok(Tensor::with_data(&shape, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encoded(t: &Tensor) -> Vec<u8> {
        let mut buf = Vec::new();
        t.save(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_layout_is_little_endian() {
        let buf = encoded(&Tensor::column_vector(&[1.5, -2.0]));
        assert_eq!(&buf[0..4], &2i32.to_le_bytes());
        assert_eq!(&buf[4..8], &2i32.to_le_bytes());
        assert_eq!(&buf[8..12], &1i32.to_le_bytes());
        assert_eq!(&buf[12..16], &2i32.to_le_bytes());
        assert_eq!(&buf[16..24], &1.5f64.to_le_bytes());
        assert_eq!(&buf[24..32], &(-2.0f64).to_le_bytes());
        assert_eq!(buf.len(), 32);
    }

    #[test]
    fn test_scalar_round_trip() {
        let s = Tensor::scalar(3.25);
        let buf = encoded(&s);
        assert_eq!(&buf[0..4], &0i32.to_le_bytes());
        assert_eq!(&buf[4..8], &1i32.to_le_bytes());
        let loaded = Tensor::load(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded, s);
        assert_eq!(loaded.shape(), s.shape());
    }

    #[test]
    fn test_matrix_round_trip_keeps_shape() {
        let m = Tensor::from_rows(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let loaded = Tensor::load(&mut Cursor::new(encoded(&m))).unwrap();
        assert_eq!(loaded.shape(), &[2, 3]);
        assert_eq!(loaded.strides(), &[3, 1]);
        assert_eq!(loaded, m);
    }

    #[test]
    fn test_count_mismatch_is_format_error() {
        let mut buf = Vec::new();
        write_i32(&mut buf, 1).unwrap();
        write_i32(&mut buf, 3).unwrap();
        write_i32(&mut buf, 2).unwrap();
        write_f64(&mut buf, 1.0).unwrap();
        write_f64(&mut buf, 2.0).unwrap();
        let err = Tensor::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }

    #[test]
    fn test_negative_dimension_is_format_error() {
        let mut buf = Vec::new();
        write_i32(&mut buf, 1).unwrap();
        write_i32(&mut buf, -4).unwrap();
        let err = Tensor::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }

    #[test]
    fn test_truncated_data_is_format_error() {
        let mut buf = encoded(&Tensor::column_vector(&[1.0, 2.0, 3.0]));
        buf.truncate(buf.len() - 3);
        let err = Tensor::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }
}
