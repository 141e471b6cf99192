use crate::fields::qm31::SecureField;

/// Inverse butterfly: turns `(f(x), f(-x))` into the even/odd split `(f0, f1)` such that
/// `2*f(x) = f0(pi(x)) + x * f1(pi(x))`, where `factor` is the relevant point's inverse.
pub fn ibutterfly(a: &mut SecureField, b: &mut SecureField, factor: SecureField) {
    let a_val = *a;
    let b_val = *b;
    *a = a_val + b_val;
    *b = (a_val - b_val) * factor;
}
