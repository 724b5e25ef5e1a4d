use riftgate_serde::{ArchiveReader, ArchiveWriter, DecodeError};

/// World-space position or direction. Components travel as fixed-point
/// zigzag varints at a per-use precision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn ser(&self, writer: &mut ArchiveWriter, precision: u8) {
        writer.write_fixed(self.x, precision);
        writer.write_fixed(self.y, precision);
        writer.write_fixed(self.z, precision);
    }

    pub(crate) fn de(reader: &mut ArchiveReader, precision: u8) -> Result<Self, DecodeError> {
        Ok(Self {
            x: reader.read_fixed(precision)?,
            y: reader.read_fixed(precision)?,
            z: reader.read_fixed(precision)?,
        })
    }

    /// Per-axis quantized representation at the given precision. Sentinel
    /// comparisons and delta encoding happen in this space so that decode-side
    /// reconstruction is exact.
    pub(crate) fn quantized(&self, precision: u8) -> [i64; 3] {
        let scale = (1u32 << precision) as f32;
        [
            (self.x * scale).round() as i64,
            (self.y * scale).round() as i64,
            (self.z * scale).round() as i64,
        ]
    }

    pub(crate) fn from_quantized(components: [i64; 3], precision: u8) -> Self {
        let scale = (1u32 << precision) as f32;
        Self {
            x: components[0] as f32 / scale,
            y: components[1] as f32 / scale,
            z: components[2] as f32 / scale,
        }
    }

    /// Writes `to` as a per-axis delta against `from`, both quantized first.
    pub(crate) fn ser_delta(
        writer: &mut ArchiveWriter,
        from: &Vector3,
        to: &Vector3,
        precision: u8,
    ) {
        let from_q = from.quantized(precision);
        let to_q = to.quantized(precision);
        for axis in 0..3 {
            writer.write_zigzag(to_q[axis] - from_q[axis]);
        }
    }

    /// Reconstitutes a delta-encoded vector by addition against `from`.
    pub(crate) fn de_delta(
        reader: &mut ArchiveReader,
        from: &Vector3,
        precision: u8,
    ) -> Result<Self, DecodeError> {
        let from_q = from.quantized(precision);
        let mut components = [0i64; 3];
        for axis in 0..3 {
            components[axis] = from_q[axis] + reader.read_zigzag()?;
        }
        Ok(Self::from_quantized(components, precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_within_precision() {
        let position = Vector3::new(100.5, -200.25, 0.0);
        let mut writer = ArchiveWriter::new();
        position.ser(&mut writer, 2);
        let bytes = writer.into_bytes();

        let mut reader = ArchiveReader::new(&bytes);
        let decoded = Vector3::de(&mut reader, 2).unwrap();

        let tolerance = 0.25;
        assert!((decoded.x - position.x).abs() <= tolerance);
        assert!((decoded.y - position.y).abs() <= tolerance);
        assert!((decoded.z - position.z).abs() <= tolerance);
    }

    #[test]
    fn delta_reconstruction_is_exact_in_quantized_space() {
        let user = Vector3::new(10.125, 20.0, -5.5);
        let target = Vector3::new(11.0, 18.5, -5.5);

        let mut writer = ArchiveWriter::new();
        Vector3::ser_delta(&mut writer, &user, &target, 3);
        let bytes = writer.into_bytes();

        let mut reader = ArchiveReader::new(&bytes);
        let decoded = Vector3::de_delta(&mut reader, &user, 3).unwrap();
        assert_eq!(decoded.quantized(3), target.quantized(3));
    }
}
