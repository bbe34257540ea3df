use chronos_core::wavetable::{WavetableDescriptor, Wavetables};

const GAIN_CAL_MARK: u8 = 0x80;

fn pattern(clocks: u32, mark: u8) -> Vec<u8> {
    (0..clocks)
        .map(|i| ((i * 5 + clocks) % 0x7f) as u8 | mark)
        .collect()
}

/// A synthetic LUX1310 wavetable catalog with the lengths of the real one.
///
/// The patterns are not usable on hardware. Every gain calibration table differs from
/// every normal table.
pub fn lux1310_wavetables() -> Wavetables {
    Wavetables::new(
        [(80, 0x6), (39, 0x6), (30, 0x5), (25, 0x4), (20, 0x4)]
            .into_iter()
            .map(|(clocks, abn_delay)| WavetableDescriptor {
                clocks,
                normal_table: pattern(clocks, 0),
                gain_cal_table: pattern(clocks, GAIN_CAL_MARK),
                abn_delay,
            })
            .collect(),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog() {
        let wavetables = lux1310_wavetables();
        assert_eq!(
            vec![80, 39, 30, 25, 20],
            wavetables.iter().map(|wt| wt.clocks).collect::<Vec<_>>()
        );
        wavetables.iter().for_each(|wt| {
            assert_eq!(wt.clocks as usize, wt.normal_table.len());
            assert_eq!(wt.clocks as usize, wt.gain_cal_table.len());
            assert!(wavetables
                .iter()
                .all(|other| other.normal_table != wt.gain_cal_table));
        });
    }
}
