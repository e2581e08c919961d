use anyhow::Context;
use proxy_bench_core::prelude::DelegatedShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Share of the machine's total CPU above which the harness warns about its own usage.
const HIGH_CPU_PERCENT: f32 = 10.0;

/// Monitor the resource usage of the harness process and report high usage.
///
/// Note that this won't stop the run, it only logs a warning that the latency figures might be
/// skewed by the harness competing with the system under test for CPU.
///
/// The CPU usage for the process is collected every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL] and checked.
/// If it is above 10% with respect to the number of cores then a warning is logged.
pub(crate) fn start_monitor(mut shutdown_listener: DelegatedShutdownListener) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu_all();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[this_process_pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu(),
                );

                match sys.process(this_process_pid) {
                    Some(process) => {
                        let usage = process.cpu_usage() / cpu_count as f32;
                        if usage > HIGH_CPU_PERCENT {
                            log::warn!(
                                "High CPU usage detected. The harness is using {usage:.2}% of the CPU, with {cpu_count} available cores"
                            );
                        }
                    }
                    None => {
                        log::debug!("Process info unavailable, stopping the CPU monitor");
                        break;
                    }
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .context("Failed to start monitor thread")?;

    Ok(())
}
