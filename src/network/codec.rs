//! Binary model format (little-endian):
//! `f64` clipping limit, `i32` layer count, then each layer as a type tag
//! byte followed by its body.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::info;

use crate::error::{NnError, NnResult};
use crate::layers::{AnyLayer, Layer};
use crate::math::io::{read_f64, read_len, write_f64, write_len};
use crate::network::network::{is_valid_clipping_limit, Network};

impl Network {
    pub fn save<W: Write + ?Sized>(&self, w: &mut W) -> NnResult<()> {
        write_f64(w, self.gradient_clipping_limit())?;
        write_len(w, self.layer_count(), "layer count")?;
        for layer in self.layers() {
            layer.save(w)?;
        }
        Ok(())
    }

    pub fn load<R: Read + ?Sized>(r: &mut R) -> NnResult<Network> {
        let gradient_clipping_limit = read_f64(r)?;
        if !is_valid_clipping_limit(gradient_clipping_limit) {
            return Err(NnError::format(format!(
                "invalid gradient clipping limit {gradient_clipping_limit}"
            )));
        }
        let count = read_len(r, "layer count")?;
        if count == 0 {
            return Err(NnError::format("model has no layers"));
        }

        let mut layers: Vec<AnyLayer> = Vec::with_capacity(count.min(1024));
        for i in 0..count {
            let layer = AnyLayer::load(r)?;
            if let Some(prev) = layers.last() {
                if prev.output_size() != layer.input_size() {
                    return Err(NnError::format(format!(
                        "layer {} expects {} inputs but layer {} outputs {}",
                        i,
                        layer.input_size(),
                        i - 1,
                        prev.output_size()
                    )));
                }
            }
            layers.push(layer);
        }
        Ok(Network::new(layers, gradient_clipping_limit))
    }

    /// Writes the model to `path`, replacing any existing file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> NnResult<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        info!(path = %path.display(), layers = self.layer_count(), "model saved");
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> NnResult<Network> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let network = Network::load(&mut reader)?;
        info!(path = %path.display(), layers = network.layer_count(), "model loaded");
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::math::WeightInit;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn sample_network() -> Network {
        let mut rng = StdRng::seed_from_u64(5);
        Network::mlp_with_rng(
            &[3, 4, 2],
            ActivationFunction::LeakyReLU { alpha: 0.05 },
            ActivationFunction::Sigmoid,
            0.75,
            WeightInit::He,
            &mut rng,
        )
    }

    #[test]
    fn test_header_layout() {
        let mut buf = Vec::new();
        sample_network().save(&mut buf).unwrap();
        assert_eq!(&buf[0..8], &0.75f64.to_le_bytes());
        assert_eq!(&buf[8..12], &2i32.to_le_bytes());
        // first layer: type tag, then leaky-relu tag and slope
        assert_eq!(buf[12], 0);
        assert_eq!(buf[13], 3);
        assert_eq!(&buf[14..22], &0.05f64.to_le_bytes());
    }

    #[test]
    fn test_round_trip() {
        let net = sample_network();
        let mut buf = Vec::new();
        net.save(&mut buf).unwrap();
        let loaded = Network::load(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded, net);
    }

    #[test]
    fn test_zero_layers_is_rejected() {
        let mut buf = Vec::new();
        write_f64(&mut buf, 1.0).unwrap();
        write_len(&mut buf, 0, "layer count").unwrap();
        let err = Network::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }

    #[test]
    fn test_negative_layer_count_is_rejected() {
        let mut buf = Vec::new();
        write_f64(&mut buf, 1.0).unwrap();
        buf.extend_from_slice(&(-1i32).to_le_bytes());
        let err = Network::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }

    #[test]
    fn test_unchained_layers_are_rejected() {
        let a = sample_network();
        let mut buf = Vec::new();
        write_f64(&mut buf, 1.0).unwrap();
        write_len(&mut buf, 2, "layer count").unwrap();
        // the 3->4 layer twice
        a.layers()[0].save(&mut buf).unwrap();
        a.layers()[0].save(&mut buf).unwrap();
        let err = Network::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }

    #[test]
    fn test_non_positive_clipping_limit_is_rejected() {
        let mut valid = Vec::new();
        sample_network().save(&mut valid).unwrap();
        for limit in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let mut buf = valid.clone();
            buf[0..8].copy_from_slice(&limit.to_le_bytes());
            let err = Network::load(&mut Cursor::new(buf)).unwrap_err();
            assert!(matches!(err, NnError::Format(_)), "{limit}: {err}");
        }
    }
}
