//! 合并分区掩膜的拆分与拼接.
//!
//! 合并掩膜在一个体积中同时描述两个分区: 外周带为 `COMBINED_PERIPHERAL`,
//! 中央带为 `COMBINED_CENTRAL`, 其余为背景.

use super::BinaryMask;
use crate::consts::gray::*;
use crate::error::ShapeMismatch;
use ndarray::{Array3, ArrayView3, Zip};

/// 将合并掩膜拆分为 `(外周带, 中央带)` 两个二值掩膜.
///
/// 既不是 `COMBINED_PERIPHERAL` 也不是 `COMBINED_CENTRAL` 的非零标签被忽略.
pub fn split_combined(labels: ArrayView3<u8>) -> (BinaryMask, BinaryMask) {
    (
        BinaryMask::from_label_eq(labels, COMBINED_PERIPHERAL),
        BinaryMask::from_label_eq(labels, COMBINED_CENTRAL),
    )
}

/// 将外周带与中央带拼接为合并掩膜. 两者重叠处记为中央带.
pub fn join_zones(
    peripheral: &BinaryMask,
    central: &BinaryMask,
) -> Result<Array3<u8>, ShapeMismatch> {
    peripheral.check_shape(central)?;
    let mut out = Array3::zeros(peripheral.shape());
    Zip::from(&mut out)
        .and(peripheral.data())
        .and(central.data())
        .for_each(|o, &p, &c| {
            *o = if is_foreground(c) {
                COMBINED_CENTRAL
            } else if is_foreground(p) {
                COMBINED_PERIPHERAL
            } else {
                BACKGROUND
            };
        });
    Ok(out)
}
