use tracing::{debug, warn};

use crate::{
    as_the_crow_flies::as_the_crow_flies_matrices,
    cache::{MatricesCache, NoopMatricesCache},
    travel_matrices::TravelMatrices,
    travel_matrix_provider::TravelMatrixProvider,
};

pub struct TravelMatrixClient<C = NoopMatricesCache> {
    cache: C,
}

impl Default for TravelMatrixClient<NoopMatricesCache> {
    fn default() -> Self {
        Self {
            cache: NoopMatricesCache,
        }
    }
}

impl<C> TravelMatrixClient<C>
where
    C: MatricesCache,
{
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn fetch_matrix<P>(
        &self,
        points: &[P],
        provider: &TravelMatrixProvider,
    ) -> anyhow::Result<TravelMatrices>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        if provider.is_cacheable() {
            match self.cache.get_cached(provider, points) {
                Ok(Some(matrices)) => {
                    debug!(points = points.len(), "Travel matrices found in cache");
                    matrices.validate(points.len())?;
                    return Ok(matrices);
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "Could not read travel matrices cache"),
            }
        }

        let matrices = match provider {
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                as_the_crow_flies_matrices(points, *speed_kmh)
            }
            TravelMatrixProvider::Custom { matrices } => matrices.clone(),
        };

        matrices.validate(points.len())?;

        if provider.is_cacheable()
            && let Err(err) = self.cache.cache(provider, points, &matrices)
        {
            warn!(%err, "Could not write travel matrices cache");
        }

        Ok(matrices)
    }
}

#[cfg(test)]
mod tests {
    use geo_types::Point;

    use super::*;

    struct TestPoint(Point);

    impl From<&TestPoint> for Point {
        fn from(value: &TestPoint) -> Self {
            value.0
        }
    }

    #[test]
    fn test_fetch_as_the_crow_flies() {
        let client = TravelMatrixClient::default();
        let points = vec![
            TestPoint(Point::new(4.35, 50.85)),
            TestPoint(Point::new(4.36, 50.85)),
            TestPoint(Point::new(4.35, 50.86)),
        ];

        let matrices = client
            .fetch_matrix(
                &points,
                &TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 15.0 },
            )
            .unwrap();

        assert_eq!(matrices.num_points(), 3);
    }

    #[test]
    fn test_custom_matrices_must_match_points() {
        let client = TravelMatrixClient::default();
        let points = vec![TestPoint(Point::new(4.35, 50.85))];

        let result = client.fetch_matrix(
            &points,
            &TravelMatrixProvider::Custom {
                matrices: TravelMatrices {
                    distances: vec![0.0, 1.0, 1.0, 0.0],
                    times: vec![0.0, 1.0, 1.0, 0.0],
                },
            },
        );

        assert!(result.is_err());
    }
}
