//! Leaky bucket traffic shaping
//!
//! Bursty arrivals are admitted up to the bucket capacity and leave at a
//! fixed rate per tick. Arrivals that do not fit are dropped.

/// Default capacity in units
pub const DEFAULT_CAPACITY: u64 = 1000;
/// Default output rate in units per tick
pub const DEFAULT_RATE: u64 = 100;
/// Default bursty arrival pattern
pub const DEFAULT_TRAFFIC: [u64; 10] = [150, 400, 50, 600, 300, 10, 500, 50, 100, 200];

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub incoming: u64,
    pub accepted: u64,
    pub dropped: u64,
    /// Level after draining
    pub level: u64,
    pub sent: u64,
}

/// Bucket state
#[derive(Debug, Clone)]
pub struct LeakyBucket {
    capacity: u64,
    rate: u64,
    level: u64,
}

impl LeakyBucket {
    pub fn new(capacity: u64, rate: u64) -> Self {
        Self {
            capacity,
            rate,
            level: 0,
        }
    }

    pub fn level(&self) -> u64 {
        self.level
    }

    /// Admit `incoming` units, then drain at the output rate
    pub fn tick(&mut self, incoming: u64) -> Tick {
        let space = self.capacity - self.level;
        let accepted = incoming.min(space);
        let dropped = incoming - accepted;
        self.level += accepted;

        let sent = self.level.min(self.rate);
        self.level -= sent;

        Tick {
            incoming,
            accepted,
            dropped,
            level: self.level,
            sent,
        }
    }
}

/// A run over a whole arrival pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    pub ticks: Vec<Tick>,
    pub attempted: u64,
    pub accepted: u64,
    pub dropped: u64,
    pub sent: u64,
    pub final_level: u64,
}

/// Feed `traffic` through a fresh bucket
pub fn simulate(capacity: u64, rate: u64, traffic: &[u64]) -> Simulation {
    let mut bucket = LeakyBucket::new(capacity, rate);
    let ticks: Vec<Tick> = traffic.iter().map(|&units| bucket.tick(units)).collect();

    Simulation {
        attempted: ticks.iter().map(|t| t.incoming).sum(),
        accepted: ticks.iter().map(|t| t.accepted).sum(),
        dropped: ticks.iter().map(|t| t.dropped).sum(),
        sent: ticks.iter().map(|t| t.sent).sum(),
        final_level: bucket.level(),
        ticks,
    }
}

/// Print the simulation table and summary
pub fn run(capacity: u64, rate: u64, traffic: &[u64]) -> anyhow::Result<()> {
    if capacity == 0 || rate == 0 {
        anyhow::bail!("capacity and rate must be greater than zero");
    }
    let sim = simulate(capacity, rate, traffic);

    println!("--- Leaky Bucket Simulation ---\n");
    println!("  Bucket Capacity: {} units", capacity);
    println!("  Output Rate: {} units/tick", rate);
    println!("  Total Ticks: {}", traffic.len());
    let rule = "-".repeat(66);
    println!("{}", rule);
    println!("| Tick | Incoming | Accepted | Dropped | Current Level | Sent Out |");
    println!("{}", rule);
    for (i, t) in sim.ticks.iter().enumerate() {
        println!(
            "| {:4} | {:8} | {:8} | {:7} | {:13} | {:8} |",
            i + 1,
            t.incoming,
            t.accepted,
            t.dropped,
            t.level,
            t.sent
        );
    }
    println!("{}", rule);
    println!("\nTotal Attempted Input: {}", sim.attempted);
    println!("Total Accepted: {}", sim.accepted);
    println!("Total Dropped: {}", sim.dropped);
    println!("Total Sent: {}", sim.sent);
    println!("Final Bucket Level: {}", sim.final_level);
    Ok(())
}
