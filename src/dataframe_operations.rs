/***
STEP'LTON: discrete-time simulation of polysome translation
    Copyright (C) 2026 Andrew T. Martens

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License, version 3,
    as published by the Free Software Foundation.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

e-mail: steplton@logical.bio
***/

/* dataframe_operations.rs: aggregate occupancy snapshots using Polars
dataframes. */

use polars::prelude::*;
use polars::datatypes::DataType::Float32;

/// Per-position snapshot counts across the whole ensemble, plus the fraction
/// of transcripts contributing to each count. Unbound snapshots keep their
/// own row at pos == -1 so the downstream histogram can show the free pool.
pub fn calculate_occupancy_histogram(
    df_snapshots: &DataFrame,
    num_mRNA: u16,
) -> PolarsResult<DataFrame> {
    let sort_opts = SortMultipleOptions::default()
        .with_maintain_order(false)
        .with_multithreaded(true)
        .with_nulls_last(true)
        .with_order_descending(false);

    let result = df_snapshots
        .clone()
        .lazy()
        .group_by(["pos"])
        .agg([col("pos").count().cast(Float32).alias("count")])
        .with_column(
            (col("count") / lit(num_mRNA as f32)).alias("fractional occupancy")
        )
        .sort(["pos"], sort_opts)
        .collect()?;

    Ok(result)
}

// Fraction of each transcript's ribosomes bound at the end of the run.
pub fn calculate_bound_fraction(df_snapshots: &DataFrame) -> PolarsResult<DataFrame> {
    let result = df_snapshots
        .clone()
        .lazy()
        .group_by(["mRNA"])
        .agg([
            col("pos")
                .neq(lit(-1_i64))
                .cast(Float32)
                .mean()
                .alias("bound fraction")
        ])
        .sort(["mRNA"], Default::default())
        .collect()?;

    Ok(result)
}

/// Mean stationary-counter per final position: a cheap stall profile, since
/// large counters mark codons where ribosomes sat for many ticks.
pub fn calculate_mean_dwell_counter(
    df_snapshots: &DataFrame
) -> PolarsResult<DataFrame> {
    let sort_opts = SortMultipleOptions::default()
        .with_maintain_order(false)
        .with_multithreaded(true)
        .with_nulls_last(true)
        .with_order_descending(false);

    let result = df_snapshots
        .clone()
        .lazy()
        .group_by(["pos"])
        .agg([col("counter").mean().alias("mean dwell")])
        .sort(["pos"], sort_opts)
        .collect()?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshots() -> DataFrame {
        df!(
            "mRNA" => [0u16, 0, 1, 1],
            "ribosome" => [0u16, 1, 0, 1],
            "pos" => [-1_i64, 3, 3, 7],
            "counter" => [12_u64, 1, 3, 5],
        )
        .unwrap()
    }

    #[test]
    fn histogram_counts_each_final_position() {
        let result = calculate_occupancy_histogram(&snapshots(), 2).unwrap();

        let expected = df!(
            "pos" => [-1_i64, 3, 7],
            "count" => [1.0_f32, 2.0, 1.0],
            "fractional occupancy" => [0.5_f32, 1.0, 0.5],
        )
        .unwrap();

        assert!(result.equals(&expected), "got {:?}", result);
    }

    #[test]
    fn bound_fraction_ignores_position_but_not_unbound() {
        let result = calculate_bound_fraction(&snapshots()).unwrap();

        // mRNA 0 has one unbound of two; mRNA 1 has none.
        let expected = df!(
            "mRNA" => [0_u16, 1],
            "bound fraction" => [0.5_f32, 1.0],
        )
        .unwrap();

        assert!(result.equals(&expected), "got {:?}", result);
    }

    #[test]
    fn dwell_counters_average_per_position() {
        let result = calculate_mean_dwell_counter(&snapshots()).unwrap();

        let expected = df!(
            "pos" => [-1_i64, 3, 7],
            "mean dwell" => [12.0_f64, 2.0, 5.0],
        )
        .unwrap();

        assert!(result.equals(&expected), "got {:?}", result);
    }
}
