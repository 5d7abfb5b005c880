//! Bounded command queue and worker pool with logarithmic map merging.
//!
//! All inter-thread coordination flows through the command channel and the
//! outstanding-command counter. Worker-local maps live in per-worker slots;
//! a worker touches only its own slot until a merge command names two
//! distinct slots.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::map::{ColorStrategy, VoxelMap};
use crate::math::Transform;
use crate::triangle::VisualTriangle;
use crate::voxelizer::{TriangleObserver, Voxelizer};

/// Capacity of the shared command queue. Producers block when it is full,
/// consumers block when it is empty.
const QUEUE_CAPACITY: usize = 128;

/// A unit of work handed to the worker pool.
enum Command {
    /// Voxelize one triangle into the worker's local map.
    Voxelize(VisualTriangle),
    /// Merge the map in slot `source` into the map in slot `target` and
    /// clear the source.
    Merge {
        /// Slot that receives the union.
        target: usize,
        /// Slot that is drained.
        source: usize,
    },
    /// Terminate the worker.
    Exit,
}

/// Counts commands issued but not yet completed.
struct PendingCounter {
    count: Mutex<u64>,
    zero: Condvar,
}

impl PendingCounter {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            zero: Condvar::new(),
        }
    }

    fn increment(&self) {
        *self.count.lock().unwrap() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    fn wait_zero(&self) {
        let mut count = self.count.lock().unwrap();
        while *count != 0 {
            count = self.zero.wait(count).unwrap();
        }
    }
}

/// A fixed pool of voxelizer threads fed from one bounded command queue.
pub struct VoxelizerPool {
    sender: Sender<Command>,
    pending: Arc<PendingCounter>,
    maps: Arc<Vec<Mutex<VoxelMap>>>,
    workers: Vec<JoinHandle<()>>,
}

impl VoxelizerPool {
    /// Spawn `threads` workers, each owning a voxelizer and a map slot.
    pub fn spawn(
        threads: usize,
        transform: Transform,
        resolution: u32,
        strategy: ColorStrategy,
        observer: Option<TriangleObserver>,
    ) -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        let pending = Arc::new(PendingCounter::new());
        let maps: Arc<Vec<Mutex<VoxelMap>>> =
            Arc::new((0..threads).map(|_| Mutex::new(VoxelMap::new())).collect());

        let workers = (0..threads)
            .map(|index| {
                let receiver: Receiver<Command> = receiver.clone();
                let pending = Arc::clone(&pending);
                let maps = Arc::clone(&maps);
                let voxelizer =
                    Voxelizer::new(transform, resolution, strategy, observer.clone());
                thread::spawn(move || {
                    worker_loop(index, receiver, pending, maps, voxelizer, strategy)
                })
            })
            .collect();

        Self {
            sender,
            pending,
            maps,
            workers,
        }
    }

    /// Queue one triangle for voxelization; blocks while the queue is full.
    pub fn submit(&self, triangle: VisualTriangle) {
        self.issue(Command::Voxelize(triangle));
    }

    /// Block until every issued command has completed.
    pub fn wait_idle(&self) {
        self.pending.wait_zero();
    }

    /// Pair up non-empty worker maps and merge them in rounds until a
    /// single map remains, which is returned. Must be called after
    /// [`VoxelizerPool::wait_idle`].
    pub fn merge_maps(&self) -> VoxelMap {
        loop {
            let sizes: Vec<usize> = self
                .maps
                .iter()
                .map(|slot| slot.lock().unwrap().len())
                .collect();

            let mut pending_target: Option<usize> = None;
            let mut issued = 0;
            for (index, &size) in sizes.iter().enumerate() {
                if size == 0 {
                    continue;
                }
                match pending_target.take() {
                    None => pending_target = Some(index),
                    Some(other) => {
                        // Merge the smaller map into the larger one.
                        let (target, source) = if sizes[other] < size {
                            (index, other)
                        } else {
                            (other, index)
                        };
                        self.issue(Command::Merge { target, source });
                        issued += 1;
                    }
                }
            }

            if issued == 0 {
                return match pending_target {
                    Some(index) => std::mem::take(&mut *self.maps[index].lock().unwrap()),
                    None => VoxelMap::new(),
                };
            }
            self.wait_idle();
        }
    }

    /// Issue one exit command per worker and join them all.
    pub fn shutdown(self) {
        for _ in 0..self.workers.len() {
            self.issue(Command::Exit);
        }
        for worker in self.workers {
            let _ = worker.join();
        }
    }

    fn issue(&self, command: Command) {
        self.pending.increment();
        if self.sender.send(command).is_err() {
            // Every worker is gone; drop the command so wait_idle cannot
            // hang on a count that nobody will decrement.
            self.pending.decrement();
        }
    }
}

fn worker_loop(
    index: usize,
    receiver: Receiver<Command>,
    pending: Arc<PendingCounter>,
    maps: Arc<Vec<Mutex<VoxelMap>>>,
    mut voxelizer: Voxelizer,
    strategy: ColorStrategy,
) {
    log::debug!("voxelizer worker {index} started");
    loop {
        let Ok(command) = receiver.recv() else {
            break;
        };
        let exit = matches!(command, Command::Exit);
        match command {
            Command::Voxelize(triangle) => {
                let mut map = maps[index].lock().unwrap();
                voxelizer.voxelize(&triangle, &mut map);
            }
            Command::Merge { target, source } => {
                debug_assert_ne!(target, source);
                if target != source {
                    // Lock both slots in index order.
                    let (first, second) = if target < source {
                        (target, source)
                    } else {
                        (source, target)
                    };
                    let mut first_guard = maps[first].lock().unwrap();
                    let mut second_guard = maps[second].lock().unwrap();
                    let (target_map, source_map) = if target < source {
                        (&mut *first_guard, &mut *second_guard)
                    } else {
                        (&mut *second_guard, &mut *first_guard)
                    };
                    target_map.merge(source_map, strategy);
                }
            }
            Command::Exit => {}
        }
        pending.decrement();
        if exit {
            break;
        }
    }
    log::debug!("voxelizer worker {index} exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::WeightedColor;
    use crate::math::{Point3, Real, Vec2, VoxelPos};
    use crate::triangle::{TexturedTriangle, TriangleKind};
    use crate::voxelizer::Voxelizer;

    fn visual(vertices: [[Real; 3]; 3]) -> VisualTriangle {
        VisualTriangle::new(
            TexturedTriangle::new(
                vertices.map(|v| Point3::new(v[0], v[1], v[2])),
                [
                    Vec2::new(0.0, 0.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(0.0, 1.0),
                ],
            ),
            TriangleKind::Matte,
        )
    }

    /// The twelve triangles of the axis-aligned box `[0, size]^3`.
    fn box_triangles(size: Real) -> Vec<VisualTriangle> {
        let corners = |flat_axis: usize, plane: Real| -> [[Real; 3]; 4] {
            let (u, v) = ((flat_axis + 1) % 3, (flat_axis + 2) % 3);
            let mut quad = [[0.0; 3]; 4];
            for (i, (du, dv)) in [(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)]
                .iter()
                .enumerate()
            {
                quad[i][flat_axis] = plane;
                quad[i][u] = *du;
                quad[i][v] = *dv;
            }
            quad
        };

        let mut triangles = Vec::new();
        for axis in 0..3 {
            for plane in [0.0, size] {
                let q = corners(axis, plane);
                triangles.push(visual([q[0], q[1], q[2]]));
                triangles.push(visual([q[0], q[2], q[3]]));
            }
        }
        triangles
    }

    fn run_pool(
        triangles: &[VisualTriangle],
        threads: usize,
        resolution: u32,
        strategy: ColorStrategy,
    ) -> VoxelMap {
        let pool = VoxelizerPool::spawn(
            threads,
            Transform::identity(),
            resolution,
            strategy,
            None,
        );
        for triangle in triangles {
            pool.submit(triangle.clone());
        }
        pool.wait_idle();
        let result = pool.merge_maps();
        pool.shutdown();
        result
    }

    #[test]
    fn test_cube_surface_makes_hollow_shell() {
        let map = run_pool(&box_triangles(8.0), 4, 8, ColorStrategy::Max);
        // 8^3 minus the 6^3 interior.
        assert_eq!(map.len(), 296);
        for (pos, _) in map.iter() {
            let boundary = [pos.x, pos.y, pos.z].iter().any(|&c| c == 0 || c == 7);
            assert!(boundary, "interior voxel {pos:?} occupied");
        }
    }

    #[test]
    fn test_parallel_matches_single_threaded_blend() {
        let triangles: Vec<VisualTriangle> = (0..24)
            .map(|i| {
                let offset = i as Real / 4.0;
                visual([
                    [offset, 0.0, 0.5 + offset * 0.2],
                    [offset + 2.0, 1.0, 0.7],
                    [offset, 3.0, 5.0],
                ])
            })
            .collect();

        let parallel = run_pool(&triangles, 4, 8, ColorStrategy::Blend);

        let mut voxelizer =
            Voxelizer::new(Transform::identity(), 8, ColorStrategy::Blend, None);
        let mut serial = VoxelMap::new();
        for triangle in &triangles {
            voxelizer.voxelize(triangle, &mut serial);
        }

        assert_eq!(parallel.len(), serial.len());
        for (pos, expected) in serial.iter() {
            let got = parallel.get(pos).unwrap_or_else(|| {
                panic!("voxel {pos:?} missing from parallel result")
            });
            assert!((got.weight - expected.weight).abs() < 1e-4);
            assert!((got.value - expected.value).norm() < 1e-5);
        }
    }

    #[test]
    fn test_merge_maps_with_idle_workers() {
        // More workers than triangles: most maps stay empty and the merge
        // protocol must still converge.
        let triangles = vec![visual([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])];
        let map = run_pool(&triangles, 8, 2, ColorStrategy::Blend);
        assert_eq!(map.len(), 1);
        assert!(map.get(&VoxelPos::new(0, 0, 0)).is_some());
    }

    #[test]
    fn test_empty_pool_merges_to_empty_map() {
        let map = run_pool(&[], 3, 4, ColorStrategy::Max);
        assert!(map.is_empty());
    }

    #[test]
    fn test_counter_roundtrip() {
        let counter = PendingCounter::new();
        counter.increment();
        counter.increment();
        counter.decrement();
        counter.decrement();
        counter.wait_zero();
    }

    #[test]
    fn test_max_strategy_parallel_weights() {
        // Two coplanar triangles covering the same voxel; MAX keeps the
        // heavier contribution no matter which worker processed it.
        let small = visual([[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]]);
        let large = visual([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let map = run_pool(&[small, large.clone()], 2, 2, ColorStrategy::Max);
        let color = map.get(&VoxelPos::new(0, 0, 0)).unwrap();
        assert!((color.weight - 0.5).abs() < 1e-5);

        let expected: WeightedColor = {
            let mut voxelizer =
                Voxelizer::new(Transform::identity(), 2, ColorStrategy::Max, None);
            let mut serial = VoxelMap::new();
            voxelizer.voxelize(&large, &mut serial);
            *serial.get(&VoxelPos::new(0, 0, 0)).unwrap()
        };
        assert!((color.weight - expected.weight).abs() < 1e-6);
    }
}
