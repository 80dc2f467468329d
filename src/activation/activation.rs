use std::f64::consts::E;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{NnError, NnResult};
use crate::math::io::{read_f64, read_u8, write_f64, write_u8};
use crate::math::Tensor;

const TAG_IDENTITY: u8 = 0;
const TAG_SIGMOID: u8 = 1;
const TAG_RELU: u8 = 2;
const TAG_LEAKY_RELU: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Identity,
    Sigmoid,
    ReLU,
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Derivative evaluated at the pre-activation value `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }

    pub fn apply_to(&self, z: &Tensor) -> Tensor {
        z.map(|x| self.function(x))
    }

    pub fn derivative_of(&self, z: &Tensor) -> Tensor {
        z.map(|x| self.derivative(x))
    }

    /// Tag byte used by the model format.
    pub fn tag(&self) -> u8 {
        match self {
            ActivationFunction::Identity => TAG_IDENTITY,
            ActivationFunction::Sigmoid => TAG_SIGMOID,
            ActivationFunction::ReLU => TAG_RELU,
            ActivationFunction::LeakyReLU { .. } => TAG_LEAKY_RELU,
        }
    }

    pub fn save<W: Write + ?Sized>(&self, w: &mut W) -> NnResult<()> {
        write_u8(w, self.tag())?;
        if let ActivationFunction::LeakyReLU { alpha } = self {
            write_f64(w, *alpha)?;
        }
        Ok(())
    }

    pub fn load<R: Read + ?Sized>(r: &mut R) -> NnResult<ActivationFunction> {
        match read_u8(r)? {
            TAG_IDENTITY => Ok(ActivationFunction::Identity),
            TAG_SIGMOID => Ok(ActivationFunction::Sigmoid),
            TAG_RELU => Ok(ActivationFunction::ReLU),
            TAG_LEAKY_RELU => Ok(ActivationFunction::LeakyReLU { alpha: read_f64(r)? }),
            tag => Err(NnError::format(format!("unknown activation function tag {tag}"))),
        }
    }
}
