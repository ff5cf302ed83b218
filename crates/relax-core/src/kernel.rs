//! The three-point relaxation stencil.
//!
//! ```text
//! out[i] = 0.25 * in[i-1] + 0.5 * in[i] + 0.25 * in[i+1]   for 0 < i < n-1
//! out[i] = in[i]                                           otherwise
//! ```
//!
//! Every output cell depends only on the immutable input, so the update
//! can be evaluated for all indices in any order, or concurrently, and
//! still produce the same bits. Devices evaluate [`relax_cell`] per index;
//! [`apply`] is the sequential whole-field reference.

/// The fixed weighted-average update rule.
///
/// The weights form a convex combination, so a constant field is a fixed
/// point and every interior output lies between the minimum and maximum
/// of its three inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StencilKernel;

impl StencilKernel {
    /// Weight of the left neighbour.
    pub const WEST: f64 = 0.25;
    /// Weight of the cell itself.
    pub const CENTRE: f64 = 0.5;
    /// Weight of the right neighbour.
    pub const EAST: f64 = 0.25;

    /// Entry point name used when this rule is compiled onto a device.
    pub const ENTRY_POINT: &'static str = "relax";

    /// New value of cell `i`. See [`relax_cell`].
    pub fn cell(&self, input: &[f64], i: usize) -> f64 {
        relax_cell(input, i)
    }

    /// Apply the stencil over the whole field. See [`apply`].
    pub fn apply(&self, input: &[f64], output: &mut [f64]) {
        apply(input, output)
    }
}

/// New value of cell `i` given the previous field `input`.
///
/// Boundary cells (`i == 0`, `i == input.len() - 1`) are copied through.
/// The sum is evaluated left to right so every device agrees bit-for-bit.
#[inline]
pub fn relax_cell(input: &[f64], i: usize) -> f64 {
    if i > 0 && i + 1 < input.len() {
        StencilKernel::WEST * input[i - 1]
            + StencilKernel::CENTRE * input[i]
            + StencilKernel::EAST * input[i + 1]
    } else {
        input[i]
    }
}

/// Sequential reference application: `output[i] = relax_cell(input, i)`
/// for every `i`.
///
/// # Panics
///
/// Panics if the two slices have different lengths, like
/// [`slice::copy_from_slice`].
pub fn apply(input: &[f64], output: &mut [f64]) {
    assert_eq!(
        input.len(),
        output.len(),
        "stencil input and output must have the same length"
    );
    for (i, out) in output.iter_mut().enumerate() {
        *out = relax_cell(input, i);
    }
}
