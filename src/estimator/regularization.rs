use log::debug;

use crate::{cfg::Config, gridder::AngleGridder, prelude::Error};

/// Synthetic observation positions: the center of each coarse cell
/// above the elevation mask that holds no sample, plus rings sweeping the
/// whole azimuth range, the first one on the elevation mask and the next
/// ones stepping up towards the zenith. These positions are then observed
/// as zero valued residuals, so the fit remains bounded in the sky
/// regions that were never observed.
pub(crate) fn regularization_points(
    azimuth_deg: &[f64],
    elevation_deg: &[f64],
    cfg: &Config,
) -> Result<(Vec<f64>, Vec<f64>), Error> {
    let opts = &cfg.regularization_opts;
    let cutoff = cfg.elevation_cutoff_deg.clamp(0.0, 90.0);

    let coarse = AngleGridder::new((opts.coarse_cell_deg, opts.coarse_cell_deg))?
        .with_elevation_range(cutoff, 90.0);

    let ones = vec![1.0; azimuth_deg.len()];
    let grid = coarse.grid(azimuth_deg, elevation_deg, &ones);

    let mut points = (Vec::new(), Vec::new());

    for (i, el) in grid.elevation.iter().enumerate() {
        for (j, az) in grid.azimuth.iter().enumerate() {
            if grid.count[(i, j)] == 0 {
                points.0.push(*az);
                points.1.push(*el);
            }
        }
    }

    let empty_cells = points.0.len();

    if opts.ring_azimuth_step_deg > 0.0 {
        let n_az = (360.0 / opts.ring_azimuth_step_deg).ceil() as usize;
        for level in 0..opts.ring_levels {
            let el = cutoff + level as f64 * opts.ring_elevation_step_deg;
            if el > 90.0 {
                break;
            }
            for j in 0..n_az {
                points.0.push(j as f64 * opts.ring_azimuth_step_deg);
                points.1.push(el);
            }
        }
    }

    debug!(
        "regularization: {} empty cells, {} ring points",
        empty_cells,
        points.0.len() - empty_cells
    );

    Ok(points)
}
