//! Process metrics collection
//!
//! Collects process-level metrics like memory and CPU time using sysinfo.
//! Values are refreshed on every scrape, so no background task is needed.

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Counter, Gauge};
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::errors::Result;

/// Prometheus collector for the current process.
pub struct ProcessCollector {
    pid: Pid,
    /// Cached system info, refreshed per scrape
    system: Mutex<System>,
    resident_memory_bytes: Gauge,
    virtual_memory_bytes: Gauge,
    cpu_seconds_total: Counter,
    start_time_seconds: Gauge,
    /// Only where sysinfo can list tasks
    threads: Option<Gauge>,
}

impl ProcessCollector {
    pub fn new() -> Result<Self> {
        let threads = if cfg!(any(target_os = "linux", target_os = "android")) {
            Some(Gauge::new("process_threads", "Number of OS threads in the process")?)
        } else {
            None
        };

        Ok(Self {
            pid: Pid::from_u32(std::process::id()),
            system: Mutex::new(System::new()),
            resident_memory_bytes: Gauge::new(
                "process_resident_memory_bytes",
                "Resident memory size in bytes",
            )?,
            virtual_memory_bytes: Gauge::new(
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes",
            )?,
            cpu_seconds_total: Counter::new(
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds",
            )?,
            start_time_seconds: Gauge::new(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds",
            )?,
            threads,
        })
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        let mut collectors: Vec<&dyn Collector> = vec![
            &self.resident_memory_bytes,
            &self.virtual_memory_bytes,
            &self.cpu_seconds_total,
            &self.start_time_seconds,
        ];
        if let Some(threads) = &self.threads {
            collectors.push(threads);
        }
        collectors
    }

    fn refresh(&self) {
        let mut sys = self.system.lock();

        // Refresh only the current process, tasks included
        sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let Some(process) = sys.process(self.pid) else {
            tracing::warn!("Current process {} not visible to sysinfo", self.pid);
            return;
        };

        self.resident_memory_bytes.set(process.memory() as f64);
        self.virtual_memory_bytes.set(process.virtual_memory() as f64);
        self.start_time_seconds.set(process.start_time() as f64);

        // accumulated_cpu_time is in milliseconds
        let cpu_seconds = process.accumulated_cpu_time() as f64 / 1000.0;
        let delta = cpu_seconds - self.cpu_seconds_total.get();
        if delta > 0.0 {
            self.cpu_seconds_total.inc_by(delta);
        }

        // tasks() 不包含主线程
        if let Some(threads) = &self.threads
            && let Some(tasks) = process.tasks()
        {
            threads.set((tasks.len() + 1) as f64);
        }
    }
}

impl Collector for ProcessCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.collectors()
            .into_iter()
            .flat_map(|c| c.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.refresh();
        self.collectors()
            .into_iter()
            .flat_map(|c| c.collect())
            .collect()
    }
}
