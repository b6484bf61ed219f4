use super::slab::LineParameters;

/// One point of a rotation diagram: upper-level energy (K) against
/// `ln(lineflux / (wavenumber * g_up * A))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationDiagram {
    pub points: Vec<RotationPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationFit {
    pub slope: f64,
    pub intercept: f64,
    /// Rotational temperature `-1 / slope`, K.
    pub temperature: f64,
    pub points_used: usize,
}

/// Builds the rotation diagram of a line table.
///
/// Zero line fluxes or molecular constants are not filtered: they show up as
/// infinite or NaN ordinates.
pub fn rotation_diagram(lines: &LineParameters) -> RotationDiagram {
    RotationDiagram {
        points: lines
            .iter()
            .map(|line| {
                let transition = line.transition;
                RotationPoint {
                    x: transition.eup_k,
                    y: (line.lineflux
                        / (transition.wavenumber * transition.g_up * transition.einstein_a))
                        .ln(),
                }
            })
            .collect(),
    }
}

impl RotationDiagram {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn fit(&self) -> Option<RotationFit> {
        let finite: Vec<&RotationPoint> = self
            .points
            .iter()
            .filter(|point| point.x.is_finite() && point.y.is_finite())
            .collect();
        if finite.len() < 2 {
            return None;
        }

        let count = finite.len() as f64;
        let mean_x = finite.iter().map(|point| point.x).sum::<f64>() / count;
        let mean_y = finite.iter().map(|point| point.y).sum::<f64>() / count;
        let (sxy, sxx) = finite.iter().fold((0.0, 0.0), |(sxy, sxx), point| {
            let dx = point.x - mean_x;
            (sxy + dx * (point.y - mean_y), sxx + dx * dx)
        });
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(RotationFit {
            slope,
            intercept: mean_y - slope * mean_x,
            temperature: -1.0 / slope,
            points_used: finite.len(),
        })
    }
}
