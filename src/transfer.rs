//! Transfer (activation) function types.

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// applied to a neuron's summed, weighted input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferFunction {
    /// `f(x) = x`
    ///
    /// Input neurons always use this, whatever their layer is configured
    /// with.
    Identity,
    /// Hyperbolic tangent
    Tanh,
    /// `f(x) = sin(x)`
    Sinus,
    /// `f(x) = x^2`
    Quadratic,
}

impl TransferFunction {
    /// Evaluates `f(x)` for the selected transfer function.
    pub fn evaluate(&self, x: f64) -> f64 {
        match *self {
            TransferFunction::Identity => x,
            TransferFunction::Tanh => x.tanh(),
            TransferFunction::Sinus => x.sin(),
            TransferFunction::Quadratic => x * x,
        }
    }

    /// Evaluates the derivative `f'(x)`.
    ///
    /// Unlike an output-based formulation, `x` here is the function's own
    /// input (the neuron's net input), so neurons cache their net value.
    pub fn derivative(&self, x: f64) -> f64 {
        match *self {
            TransferFunction::Identity => 1.0,
            TransferFunction::Tanh => {
                let y = x.tanh();
                1.0 - y * y
            }
            TransferFunction::Sinus => x.cos(),
            TransferFunction::Quadratic => 2.0 * x,
        }
    }
}
