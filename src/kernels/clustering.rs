//! Clustering kernels.

use super::{Matrix, TrialInput};
use crate::{
    consts::KMEANS_ITERATIONS,
    definition::{AllocContext, Allocator, BenchmarkDefinition, KernelOperation, SizeFields},
    error::{AllocationError, KernelError},
    timing::{measure, KernelTimings},
    utils::{checked_len, try_vec_with_capacity, BenchFloat},
};

use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};
use rayon::prelude::*;

/// Synthetic data set made of well separated clusters.
pub struct ClusterData {
    /// Number of clusters the data was generated with.
    pub clusters: usize,
    /// One vector per row.
    pub points: Matrix<f64>,
}

/// Generates `clusters * vectors_per_cluster` vectors of dimension `features`. Each cluster is a
/// unit box around a centre drawn in `[0, 10 * clusters)`; vectors are stored cluster by
/// cluster.
pub fn generate_clusters<R: Rng + ?Sized>(
    features: usize,
    clusters: usize,
    vectors_per_cluster: usize,
    rng: &mut R,
) -> Result<ClusterData, AllocationError> {
    let rows = checked_len(clusters, vectors_per_cluster)?;
    let mut data = try_vec_with_capacity(checked_len(rows, features)?)?;

    let spread = Uniform::new(-0.5, 0.5);
    let extent = 10.0 * clusters.max(1) as f64;
    let centre = Uniform::new(0.0, extent);

    for _ in 0..clusters {
        let c: Vec<f64> = (0..features).map(|_| centre.sample(rng)).collect();
        for _ in 0..vectors_per_cluster {
            data.extend(c.iter().map(|x| x + spread.sample(rng)));
        }
    }

    Ok(ClusterData {
        clusters,
        points: Matrix {
            rows,
            cols: features,
            data,
        },
    })
}

fn squared_distance<T: BenchFloat>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (x, y)| acc + (*x - *y) * (*x - *y))
}

/// Lloyd's k-means with `iterations` rounds. The initial centroids are `k` vectors evenly spaced
/// through the data set. Returns the centroids and the cluster of every vector.
pub fn kmeans<T: BenchFloat>(
    points: &Matrix<T>,
    k: usize,
    iterations: usize,
) -> Result<(Matrix<T>, Vec<usize>), KernelError> {
    let (n, d) = (points.rows, points.cols);
    if k == 0 || k > n {
        return Err(KernelError::Other(format!(
            "cannot form {k} clusters from {n} vectors"
        )));
    }

    let mut centroids: Matrix<T> = Matrix::zeros(k, d)?;
    for c in 0..k {
        let src = c * n / k;
        centroids.data[c * d..(c + 1) * d].copy_from_slice(points.row(src));
    }

    let mut assignment = vec![0; n];
    for _ in 0..iterations {
        assignment.par_iter_mut().enumerate().for_each(|(i, slot)| {
            let p = points.row(i);
            *slot = (0..k)
                .map(|c| (c, squared_distance(p, centroids.row(c))))
                .fold((0, T::infinity()), |best, cur| {
                    if cur.1 < best.1 {
                        cur
                    } else {
                        best
                    }
                })
                .0;
        });

        let mut sums: Matrix<T> = Matrix::zeros(k, d)?;
        let mut counts = vec![0usize; k];
        for (i, &c) in assignment.iter().enumerate() {
            counts[c] += 1;
            sums.data[c * d..(c + 1) * d]
                .iter_mut()
                .zip(points.row(i))
                .for_each(|(s, x)| *s += *x);
        }
        for (c, &count) in counts.iter().enumerate() {
            // Empty clusters keep their previous centroid.
            if count == 0 {
                continue;
            }
            let inv = T::one() / T::from_usize(count);
            centroids.data[c * d..(c + 1) * d]
                .iter_mut()
                .zip(&sums.data[c * d..(c + 1) * d])
                .for_each(|(m, s)| *m = *s * inv);
        }
    }

    Ok((centroids, assignment))
}

/// Allocator of the clustering kernels.
pub struct ClusterAllocator;

impl Allocator for ClusterAllocator {
    fn allocate(
        &self,
        definition: &BenchmarkDefinition,
        size_index: usize,
        ctx: &mut AllocContext<'_>,
    ) -> Result<TrialInput, AllocationError> {
        match definition.sizes.fields(size_index) {
            SizeFields::Clustering {
                features,
                clusters,
                vectors_per_cluster,
            } => Ok(TrialInput::Clusters(generate_clusters(
                features,
                clusters,
                vectors_per_cluster,
                &mut ctx.rng,
            )?)),
            other => Err(AllocationError::InvalidSize(format!(
                "clustering kernel given {other}"
            ))),
        }
    }
}

/// Timed k-means clustering, asking for as many clusters as were generated.
pub struct KmeansKernel;

impl KernelOperation for KmeansKernel {
    fn run(
        &self,
        _definition: &BenchmarkDefinition,
        input: &mut TrialInput,
    ) -> Result<KernelTimings, KernelError> {
        let TrialInput::Clusters(data) = input else {
            return Err(KernelError::InputMismatch {
                expected: "cluster",
                actual: input.variant_name(),
            });
        };

        let (result, timings) =
            measure(|| kmeans(&data.points, data.clusters, KMEANS_ITERATIONS));
        result?;
        Ok(timings)
    }
}
