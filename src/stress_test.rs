use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use weft_core::{CCounter, CounterOp, Crdt, Rga, RgaOp};
use weft_delta::Replica;
use weft_registry::{DynCrdt, Registry};

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_replicas: usize,
    pub operations_per_replica: usize,
    pub total_syncs: usize,
    pub total_time: Duration,
    pub avg_sync_time: Duration,
    pub ops_per_second: f64,
    pub converged: bool,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Replicas:        {:>38} ║", self.num_replicas);
        println!("║  Operations per Replica:    {:>38} ║", self.operations_per_replica);
        println!("║  Total Sync Operations:     {:>38} ║", self.total_syncs);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Sync Time:         {:>36}µs ║", format!("{:.2}", self.avg_sync_time.as_micros()));
        println!("║  Operations/Second:         {:>38.0} ║", self.ops_per_second);
        println!("║  Converged:                 {:>38} ║", if self.converged { "yes" } else { "NO" });
        println!("╚════════════════════════════════════════════════════════════╝");
    }

    fn collect(
        num_replicas: usize,
        ops_per_replica: usize,
        sync_times: &[Duration],
        start: Instant,
        converged: bool,
    ) -> Self {
        let total_time = start.elapsed();
        let total_syncs = sync_times.len();

        let avg_sync_time = if !sync_times.is_empty() {
            sync_times.iter().sum::<Duration>() / total_syncs as u32
        } else {
            Duration::ZERO
        };

        let total_operations = (num_replicas * ops_per_replica) + total_syncs;
        let ops_per_second = total_operations as f64 / total_time.as_secs_f64();

        Self {
            num_replicas,
            operations_per_replica: ops_per_replica,
            total_syncs,
            total_time,
            avg_sync_time,
            ops_per_second,
            converged,
        }
    }
}

fn banner(title: &str, num_replicas: usize, ops_per_replica: usize, num_syncs: usize) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║  {:<58}║", title);
    println!("║  Replicas: {} | Ops/Replica: {} | Syncs: {} ║",
             num_replicas, ops_per_replica, num_syncs);
    println!("╚════════════════════════════════════════════════════════════╝");
}

/// Generator that yields replica indices for synchronization patterns
fn replica_sync_generator(num_replicas: usize, num_syncs: usize) -> impl Stream<Item = (usize, usize)> {
    stream! {
        let mut rng = StdRng::from_entropy();
        for _ in 0..num_syncs {
            let replica_a = rng.gen_range(0..num_replicas);
            let replica_b = rng.gen_range(0..num_replicas);
            yield (replica_a, replica_b);
        }
    }
}

type Shared<C> = Arc<Mutex<Replica<C>>>;

fn new_replicas<C: Crdt>(num_replicas: usize, make: impl Fn(&str) -> C) -> Vec<Shared<C>> {
    (0..num_replicas)
        .map(|idx| {
            let id = format!("replica_{}", idx);
            let mut replica = Replica::new(id.clone(), make(&id));
            for peer in (0..num_replicas).filter(|&peer| peer != idx) {
                replica.register_peer(format!("replica_{}", peer));
            }
            Arc::new(Mutex::new(replica))
        })
        .collect()
}

/// Ship `from`'s unacknowledged deltas to `to`. Returns whether anything moved.
fn exchange<C: Crdt>(from: &mut Replica<C>, to: &mut Replica<C>) -> bool {
    let Some(payload) = from.prepare_sync(to.id()) else {
        return false;
    };
    match to.receive(from.id(), payload) {
        Ok(seq) => {
            from.process_ack(to.id(), seq);
            true
        }
        Err(err) => {
            tracing::warn!(%err, from = from.id(), to = to.id(), "sync payload rejected");
            false
        }
    }
}

/// Two-way delta exchange between two replicas
async fn perform_sync<C: Crdt>(
    replicas: &[Shared<C>],
    replica_a_idx: usize,
    replica_b_idx: usize,
    num_syncs: usize,
    sync_times: &mut Vec<Duration>,
) {
    if replica_a_idx == replica_b_idx {
        return; // Skip self-sync
    }

    let sync_start = Instant::now();

    let replica_a = Arc::clone(&replicas[replica_a_idx]);
    let replica_b = Arc::clone(&replicas[replica_b_idx]);

    let (mut a, mut b) = tokio::join!(replica_a.lock(), replica_b.lock());
    exchange(&mut a, &mut b);
    exchange(&mut b, &mut a);
    drop(a);
    drop(b);

    sync_times.push(sync_start.elapsed());

    if sync_times.len() % 100 == 0 {
        println!("  Syncs completed: {}/{}", sync_times.len(), num_syncs);
    }
}

/// Random pairwise syncs, then all-pairs rounds until nothing is left to
/// ship. Returns whether every replica ends with the same value.
async fn synchronize<C: Crdt>(replicas: &[Shared<C>], num_syncs: usize, sync_times: &mut Vec<Duration>) -> bool
where
    C::Value: PartialEq,
{
    let mut sync_gen = Box::pin(replica_sync_generator(replicas.len(), num_syncs));
    while let Some((replica_a_idx, replica_b_idx)) = sync_gen.next().await {
        perform_sync(replicas, replica_a_idx, replica_b_idx, num_syncs, sync_times).await;
    }

    // Settle
    for round in 0..replicas.len() * 2 {
        let mut moved = false;
        for a in 0..replicas.len() {
            for b in (0..replicas.len()).filter(|&b| b != a) {
                let (mut from, mut to) = tokio::join!(replicas[a].lock(), replicas[b].lock());
                moved |= exchange(&mut from, &mut to);
            }
        }
        if !moved {
            tracing::debug!(round, "replicas settled");
            break;
        }
    }

    let mut values = Vec::with_capacity(replicas.len());
    for replica in replicas {
        values.push(replica.lock().await.value());
    }
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// Stress test for the commutative counter with async synchronization
pub async fn stress_test_ccounter(
    num_replicas: usize,
    ops_per_replica: usize,
    num_syncs: usize,
) -> StressTestStats {
    banner("CCounter Stress Test (Async)", num_replicas, ops_per_replica, num_syncs);

    let start = Instant::now();
    let replicas = new_replicas(num_replicas, |id| CCounter::new(id));

    println!("\n[Phase 1/2] Incrementing and decrementing...");

    let mut handles = vec![];
    for replica in &replicas {
        let replica = Arc::clone(replica);
        let handle = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut contribution = 0i64;
            for i in 0..ops_per_replica {
                let by = rng.gen_range(1..=10u64);
                let op = if rng.gen_bool(0.3) {
                    contribution -= by as i64;
                    CounterOp::Dec { by }
                } else {
                    contribution += by as i64;
                    CounterOp::Inc { by }
                };

                let mut counter = replica.lock().await;
                if let Err(err) = counter.apply(op) {
                    tracing::warn!(%err, "counter op failed");
                }
                drop(counter);

                if i % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            contribution
        });
        handles.push(handle);
    }

    let mut expected = 0i64;
    for handle in handles {
        match handle.await {
            Ok(contribution) => expected += contribution,
            Err(err) => tracing::error!(%err, "counter task failed"),
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Synchronizing replicas...");

    let mut sync_times = vec![];
    let mut converged = synchronize(&replicas, num_syncs, &mut sync_times).await;

    let value = replicas[0].lock().await.value();
    if value != expected {
        tracing::error!(value, expected, "counter lost updates");
        converged = false;
    }

    println!("[Phase 2/2] ✓ Completed (value = {})", value);

    StressTestStats::collect(num_replicas, ops_per_replica, &sync_times, start, converged)
}

/// Stress test for the RGA with async synchronization
pub async fn stress_test_rga(
    num_replicas: usize,
    ops_per_replica: usize,
    num_syncs: usize,
) -> StressTestStats {
    banner("RGA Stress Test (Async)", num_replicas, ops_per_replica, num_syncs);

    let start = Instant::now();
    let replicas = new_replicas(num_replicas, |id| Rga::<String>::new(id));

    println!("\n[Phase 1/2] Inserting and removing elements...");

    let mut handles = vec![];
    for (idx, replica) in replicas.iter().enumerate() {
        let replica = Arc::clone(replica);
        let handle = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            for i in 0..ops_per_replica {
                let value = format!("item_{}_{}", idx, i);
                let mut list = replica.lock().await;

                let len = list.state().len();
                let op = match rng.gen_range(0..10) {
                    0..=4 => RgaOp::Push { value },
                    5..=7 => RgaOp::InsertAt {
                        pos: rng.gen_range(0..=len),
                        value,
                    },
                    _ if len > 0 => RgaOp::RemoveAt {
                        pos: rng.gen_range(0..len),
                    },
                    _ => RgaOp::Push { value },
                };
                if let Err(err) = list.apply(op) {
                    tracing::warn!(%err, "rga op failed");
                }
                drop(list);

                if i % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(%err, "rga task failed");
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Synchronizing replicas...");

    let mut sync_times = vec![];
    let converged = synchronize(&replicas, num_syncs, &mut sync_times).await;
    let len = replicas[0].lock().await.value().len();

    println!("[Phase 2/2] ✓ Completed ({} live elements)", len);

    StressTestStats::collect(num_replicas, ops_per_replica, &sync_times, start, converged)
}

struct JsonReplica {
    handle: Box<dyn DynCrdt>,
    state: Value,
}

/// Stress test driving registry-created RGA handles purely through JSON,
/// synchronizing by full-state joins
pub async fn stress_test_registry(
    num_replicas: usize,
    ops_per_replica: usize,
    num_syncs: usize,
) -> weft_registry::Result<StressTestStats> {
    banner("Registry/JSON RGA Stress Test (Async)", num_replicas, ops_per_replica, num_syncs);

    let start = Instant::now();
    let registry = Registry::with_builtins();

    let mut replicas = Vec::with_capacity(num_replicas);
    for idx in 0..num_replicas {
        let handle = registry.create("rga", format!("replica_{}", idx))?;
        let state = handle.initial()?;
        replicas.push(Arc::new(Mutex::new(JsonReplica { handle, state })));
    }

    println!("\n[Phase 1/2] Applying JSON operations...");

    let mut handles = vec![];
    for (idx, replica) in replicas.iter().enumerate() {
        let replica = Arc::clone(replica);
        let handle = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            for i in 0..ops_per_replica {
                let mut guard = replica.lock().await;
                let JsonReplica { handle, state } = &mut *guard;

                let len = handle
                    .value_of(state)?
                    .as_array()
                    .map_or(0, Vec::len);
                let op = if len > 0 && rng.gen_bool(0.2) {
                    json!({"op": "removeAt", "pos": rng.gen_range(0..len)})
                } else {
                    json!({"op": "insertAt", "pos": rng.gen_range(0..=len), "value": {"replica": idx, "seq": i}})
                };

                let delta = handle.mutate(state, op)?;
                *state = handle.join(state, &delta)?;
                drop(guard);

                if i % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            Ok::<(), weft_registry::RegistryError>(())
        });
        handles.push(handle);
    }

    for handle in handles {
        match handle.await {
            Ok(result) => result?,
            Err(err) => tracing::error!(%err, "registry task failed"),
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Synchronizing replicas...");

    let mut sync_times = vec![];
    let mut sync_gen = Box::pin(replica_sync_generator(num_replicas, num_syncs));
    while let Some((a_idx, b_idx)) = sync_gen.next().await {
        if a_idx == b_idx {
            continue;
        }
        let sync_start = Instant::now();
        let (mut a, mut b) = tokio::join!(replicas[a_idx].lock(), replicas[b_idx].lock());
        let merged = a.handle.join(&a.state, &b.state)?;
        a.state = merged.clone();
        b.state = merged;
        sync_times.push(sync_start.elapsed());
    }

    // One sweep through every replica leaves the last holding everything;
    // a second hands it back out
    let observer = registry.create("rga", "observer")?;
    let mut merged = observer.initial()?;
    for _ in 0..2 {
        for replica in &replicas {
            let mut replica = replica.lock().await;
            merged = observer.join(&merged, &replica.state)?;
            replica.state = merged.clone();
        }
    }

    let mut values = Vec::with_capacity(num_replicas);
    for replica in &replicas {
        let replica = replica.lock().await;
        values.push(replica.handle.value_of(&replica.state)?);
    }
    let converged = values.windows(2).all(|pair| pair[0] == pair[1]);

    println!("[Phase 2/2] ✓ Completed");

    Ok(StressTestStats::collect(num_replicas, ops_per_replica, &sync_times, start, converged))
}

/// Stress tests across increasing replica counts
pub async fn stress_test_scaling(max_replicas: usize, step_size: usize) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║    Scaling Analysis - CCounter Performance vs Replicas    ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current_replicas = step_size;
    while current_replicas <= max_replicas {
        let stats = stress_test_ccounter(current_replicas, 50, current_replicas * 100).await;
        stats.print();
        current_replicas += step_size;
    }
}
