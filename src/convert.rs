// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Reorders Legacy-correlator visibilities into the MWAX-style canonical layout.

Major contributor (original algorithm): Brian Crosse (Curtin Institute for
Radio Astronomy).
*/

use log::trace;
use std::fmt;

use crate::misc::get_baseline_count;
use crate::rfinput::RFInput;

/// Flips the bits of an 8-bit fine-PFB input index so `abcdefgh` becomes
/// `abghcdef` — undoes the ordering imposed by the fine-PFB hardware.
fn fine_pfb_reorder(input: usize) -> usize {
    (input & 0xc0) | ((input & 0x03) << 4) | ((input & 0x3c) >> 2)
}

/// For one output baseline, where in a Legacy HDU each polarisation product
/// lives, and whether it needs conjugating to land in the canonical
/// `ant1 <= ant2` upper triangle.
pub(crate) struct LegacyConversionBaseline {
    pub ant1: usize,
    pub ant2: usize,
    pub xx_index: usize,
    pub xx_conjugate: bool,
    pub xy_index: usize,
    pub xy_conjugate: bool,
    pub yx_index: usize,
    pub yx_conjugate: bool,
    pub yy_index: usize,
    pub yy_conjugate: bool,
}

impl LegacyConversionBaseline {
    fn new(ant1: usize, ant2: usize, xx: i32, xy: i32, yx: i32, yy: i32) -> Self {
        Self {
            ant1,
            ant2,
            xx_index: xx.unsigned_abs() as usize,
            xx_conjugate: xx < 0,
            xy_index: xy.unsigned_abs() as usize,
            xy_conjugate: xy < 0,
            yx_index: yx.unsigned_abs() as usize,
            yx_conjugate: yx < 0,
            yy_index: yy.unsigned_abs() as usize,
            yy_conjugate: yy < 0,
        }
    }
}

impl fmt::Debug for LegacyConversionBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}v{} xx={} xy={} yx={} yy={}",
            self.ant1, self.ant2, self.xx_index, self.xy_index, self.yx_index, self.yy_index
        )
    }
}

/// Builds the full 256x256 legacy-input to mwax-order matrix. Entry
/// `[row][col]` is the index (in the raw legacy HDU) of the complex value
/// for that (row rf_input, col rf_input) pair, negative if it must be read
/// as the conjugate of the transposed entry.
fn generate_full_matrix(mwax_order: Vec<usize>) -> Vec<i32> {
    assert_eq!(mwax_order.len(), 256);

    let mut full_matrix: Vec<i32> = vec![-1; 65536];
    let mut source_legacy_ndx: i32 = 0;

    for col_order in (0..256).step_by(2) {
        let col_a = mwax_order[fine_pfb_reorder(col_order)];
        let col_b = mwax_order[fine_pfb_reorder(col_order + 1)];

        for row_order in (0..=col_order).step_by(2) {
            let row1st = mwax_order[fine_pfb_reorder(row_order)];
            let row2nd = mwax_order[fine_pfb_reorder(row_order + 1)];

            full_matrix[(row1st << 8) | col_a] = source_legacy_ndx;
            source_legacy_ndx += 1;
            if col_order != row_order {
                full_matrix[(row2nd << 8) | col_a] = source_legacy_ndx;
            }
            source_legacy_ndx += 1;
            full_matrix[(row1st << 8) | col_b] = source_legacy_ndx;
            source_legacy_ndx += 1;
            full_matrix[(row2nd << 8) | col_b] = source_legacy_ndx;
            source_legacy_ndx += 1;
        }
    }

    for row_order in 0..256 {
        for col_order in 0..256 {
            if full_matrix[(row_order << 8) | col_order] == -1 {
                full_matrix[(row_order << 8) | col_order] =
                    -full_matrix[(col_order << 8) | row_order];
            }
        }
    }

    full_matrix
}

/// Builds the full conversion table (one entry per output baseline) from the
/// metafits' RF inputs. Requires all 256 Legacy rf_inputs (128 tiles).
pub(crate) fn generate_conversion_array(rf_inputs: &[RFInput]) -> Vec<LegacyConversionBaseline> {
    assert_eq!(rf_inputs.len(), 256);

    let mut map: Vec<(u32, u32)> = rf_inputs.iter().map(|rf| (rf.input, rf.subfile_order)).collect();
    map.sort_unstable();
    let mwax_order: Vec<usize> = map.into_iter().map(|(_, s)| s as usize).collect();

    let full_matrix = generate_full_matrix(mwax_order);

    let baseline_count = get_baseline_count(128);
    let mut conversion_table = Vec::with_capacity(baseline_count);

    for row_tile in 0..128 {
        for col_tile in row_tile..128 {
            let xx = full_matrix[(row_tile * 2) << 8 | (col_tile * 2)] * 2;
            let xy = full_matrix[(row_tile * 2) << 8 | (col_tile * 2 + 1)] * 2;
            let yx = full_matrix[(row_tile * 2 + 1) << 8 | (col_tile * 2)] * 2;
            let yy = full_matrix[(row_tile * 2 + 1) << 8 | (col_tile * 2 + 1)] * 2;

            conversion_table.push(LegacyConversionBaseline::new(
                row_tile, col_tile, xx, xy, yx, yy,
            ));
        }
    }

    assert_eq!(conversion_table.len(), baseline_count);
    trace!("legacy_conversion_table has {} entries", conversion_table.len());

    conversion_table
}

/// Reorders a Legacy HDU (raw `[fine_chan][baseline][pol][re,im]`) into the
/// canonical `[baseline][fine_chan][pol][re,im]` layout.
pub(crate) fn convert_legacy_hdu_to_mwax_baseline_order(
    conversion_table: &[LegacyConversionBaseline],
    input_buffer: &[f32],
    output_buffer: &mut [f32],
    num_fine_chans: usize,
) {
    let num_baselines = get_baseline_count(128);
    let floats_per_baseline_fine_chan = 8;
    let floats_per_fine_chan = num_baselines * floats_per_baseline_fine_chan;
    let floats_per_baseline = floats_per_baseline_fine_chan * num_fine_chans;

    assert!(input_buffer.len() >= num_fine_chans * floats_per_fine_chan);
    assert!(output_buffer.len() >= num_fine_chans * floats_per_fine_chan);

    for fine_chan_index in 0..num_fine_chans {
        for (baseline_index, baseline) in conversion_table.iter().enumerate() {
            let source_index = fine_chan_index * floats_per_fine_chan;
            let destination_index =
                (baseline_index * floats_per_baseline) + (fine_chan_index * floats_per_baseline_fine_chan);

            write_pol_quad(input_buffer, output_buffer, source_index, destination_index, baseline);
        }
    }
}

/// Reorders a Legacy HDU into the canonical `[fine_chan][baseline][pol][re,im]`
/// layout (frequency-major).
pub(crate) fn convert_legacy_hdu_to_mwax_frequency_order(
    conversion_table: &[LegacyConversionBaseline],
    input_buffer: &[f32],
    output_buffer: &mut [f32],
    num_fine_chans: usize,
) {
    let num_baselines = get_baseline_count(128);
    let floats_per_baseline_fine_chan = 8;
    let floats_per_fine_chan = num_baselines * floats_per_baseline_fine_chan;

    assert!(input_buffer.len() >= num_fine_chans * floats_per_fine_chan);
    assert!(output_buffer.len() >= num_fine_chans * floats_per_fine_chan);

    for fine_chan_index in 0..num_fine_chans {
        for (baseline_index, baseline) in conversion_table.iter().enumerate() {
            let source_index = fine_chan_index * floats_per_fine_chan;
            let destination_index = source_index + (baseline_index * floats_per_baseline_fine_chan);

            write_pol_quad(input_buffer, output_buffer, source_index, destination_index, baseline);
        }
    }
}

fn write_pol_quad(
    input_buffer: &[f32],
    output_buffer: &mut [f32],
    source_index: usize,
    destination_index: usize,
    baseline: &LegacyConversionBaseline,
) {
    let pairs = [
        (baseline.xx_index, baseline.xx_conjugate, 0),
        (baseline.xy_index, baseline.xy_conjugate, 2),
        (baseline.yx_index, baseline.yx_conjugate, 4),
        (baseline.yy_index, baseline.yy_conjugate, 6),
    ];

    for (index, conjugate, offset) in pairs {
        output_buffer[destination_index + offset] = input_buffer[source_index + index];
        let imag = input_buffer[source_index + index + 1];
        // Legacy emits the lower triangle conjugate; when we swap into the
        // upper triangle we must conjugate again, so a non-conjugate lookup
        // still needs negating here.
        output_buffer[destination_index + offset + 1] = if conjugate { imag } else { -imag };
    }
}

/// Transposes a V2 (MWAX) HDU from raw `[baseline][fine_chan][pol][re,im]`
/// into the canonical `[fine_chan][baseline][pol][re,im]` layout. No
/// conjugation needed: MWAX already packs `ant1 <= ant2`.
pub(crate) fn convert_mwax_hdu_to_frequency_order(
    input_buffer: &[f32],
    output_buffer: &mut [f32],
    num_baselines: usize,
    num_fine_chans: usize,
    num_visibility_pols: usize,
) {
    let floats_per_baseline_fine_chan = num_visibility_pols * 2;
    let floats_per_baseline = num_fine_chans * floats_per_baseline_fine_chan;
    let floats_per_fine_chan = num_baselines * floats_per_baseline_fine_chan;

    assert!(input_buffer.len() >= num_fine_chans * floats_per_fine_chan);
    assert!(output_buffer.len() >= num_fine_chans * floats_per_fine_chan);

    for baseline_index in 0..num_baselines {
        for fine_chan_index in 0..num_fine_chans {
            let source_index =
                (baseline_index * floats_per_baseline) + (fine_chan_index * floats_per_baseline_fine_chan);
            let destination_index =
                (fine_chan_index * floats_per_fine_chan) + (baseline_index * floats_per_baseline_fine_chan);

            output_buffer[destination_index..destination_index + floats_per_baseline_fine_chan]
                .clone_from_slice(
                    &input_buffer[source_index..source_index + floats_per_baseline_fine_chan],
                );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fine_pfb_reorder() {
        let single_pfb_output_to_input: Vec<usize> = vec![
            0, 16, 32, 48, 1, 17, 33, 49, 2, 18, 34, 50, 3, 19, 35, 51, 4, 20, 36, 52, 5, 21, 37,
            53, 6, 22, 38, 54, 7, 23, 39, 55, 8, 24, 40, 56, 9, 25, 41, 57, 10, 26, 42, 58, 11, 27,
            43, 59, 12, 28, 44, 60, 13, 29, 45, 61, 14, 30, 46, 62, 15, 31, 47, 63,
        ];

        for pfb in 0..4 {
            for (i, pfb_output) in single_pfb_output_to_input.iter().enumerate() {
                let hardcoded = pfb_output + (64 * pfb);
                let calculated = fine_pfb_reorder(i + (64 * pfb));
                assert_eq!(hardcoded, calculated);
            }
        }
    }

    #[test]
    fn test_generate_full_matrix_is_antisymmetric_for_off_diagonal() {
        let mwax_order: Vec<usize> = (0..256).collect();
        let matrix = generate_full_matrix(mwax_order);

        for row in 0..256 {
            for col in 0..256 {
                if row != col {
                    assert_eq!(
                        matrix[(row << 8) | col],
                        -matrix[(col << 8) | row],
                        "row={} col={}",
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_convert_mwax_hdu_to_frequency_order_identity_single_baseline() {
        let num_baselines = 1;
        let num_fine_chans = 2;
        let num_visibility_pols = 4;
        let floats_per_bl_chan = num_visibility_pols * 2;

        let input: Vec<f32> = (0..(num_fine_chans * floats_per_bl_chan) as i32)
            .map(|v| v as f32)
            .collect();
        let mut output = vec![0.0f32; input.len()];

        convert_mwax_hdu_to_frequency_order(
            &input,
            &mut output,
            num_baselines,
            num_fine_chans,
            num_visibility_pols,
        );

        assert_eq!(input, output);
    }
}
