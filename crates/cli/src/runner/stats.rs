//! Run statistics.

use std::time::Duration;

use broker::MetricsSnapshot;

/// Statistics from a broker run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Wall-clock duration including the drain
    pub duration: Duration,

    /// Registered tasks
    pub tasks: usize,

    /// Distinct namespaces across tasks
    pub namespaces: usize,

    /// Sink name
    pub sink: String,

    /// Broker counters at termination
    pub metrics: MetricsSnapshot,
}

impl RunStats {
    /// Points shipped per second
    pub fn points_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.points_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of sink calls that failed, as a percentage
    pub fn publish_failure_rate(&self) -> f64 {
        let total = self.metrics.batches_published + self.metrics.publish_failures;
        if total > 0 {
            (self.metrics.publish_failures as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Broker Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Tasks: {}", self.tasks);
        println!("   ├─ Namespaces: {}", self.namespaces);
        println!("   └─ Sink: {}", self.sink);

        let m = &self.metrics;
        println!("\n📈 Firings");
        println!("   ├─ Fires scheduled: {}", m.fires);
        println!("   ├─ Firings processed: {}", m.firings);
        println!("   ├─ Firings coalesced: {}", m.firings_coalesced);
        println!("   └─ Collection failures: {}", m.collection_failures);

        println!("\n📤 Publishing");
        println!("   ├─ Batches published: {}", m.batches_published);
        println!(
            "   ├─ Publish failures: {} ({:.2}%)",
            m.publish_failures,
            self.publish_failure_rate()
        );
        println!("   ├─ Points published: {}", m.points_published);
        println!("   └─ Points/s: {:.2}", self.points_per_sec());

        println!();
    }
}
