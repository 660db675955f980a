//! 流量控制场景仿真
//!
//! 两台主机之间一条点到点链路，发送端出口挂一棵 queue disc 树。
//! 默认场景：10 Mbps / 2 ms，网卡发送队列 1 个包，根节点为 Prio（两个 Fifo band），
//! 两条 50 Mbps 的流，其中一条打了优先级标签。

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tcq_rs::scenario::run_traffic_control;
use tcq_rs::sim::ScenarioSpec;
use tcq_rs::trace::TraceEventKind;

#[derive(Debug, Parser)]
#[command(name = "traffic_control", about = "流量控制仿真：queue disc + 点到点网卡")]
struct Args {
    /// 场景 JSON 文件；缺省使用内置默认场景
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// 覆盖场景里的结束时间（毫秒）
    #[arg(long)]
    until_ms: Option<u64>,
    /// 把事件记录写成 JSON 文件
    #[arg(long)]
    trace_json: Option<PathBuf>,
    /// 把汇总写成 JSON 文件
    #[arg(long)]
    summary_json: Option<PathBuf>,
    /// 打印根 queue disc 和网卡发送队列的包数变化
    #[arg(long, default_value_t = false)]
    print_queue_trace: bool,
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut spec = match &args.scenario {
        Some(path) => match ScenarioSpec::load(path) {
            Ok(spec) => spec,
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        },
        None => ScenarioSpec::default(),
    };
    if let Some(until_ms) = args.until_ms {
        spec.until_ms = until_ms;
    }

    let record_trace = args.trace_json.is_some() || args.print_queue_trace;
    let outcome = match run_traffic_control(&spec, record_trace) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    let report = &outcome.report;

    if args.print_queue_trace {
        if let Some(trace) = &outcome.trace {
            for ev in &trace.events {
                match ev.kind {
                    TraceEventKind::TcPacketsInQueue { old, new } => {
                        println!("{} TcPacketsInQueue {old} to {new}", ev.t_ns);
                    }
                    TraceEventKind::DevicePacketsInQueue { old, new } => {
                        println!("{} DevicePacketsInQueue {old} to {new}", ev.t_ns);
                    }
                    _ => {}
                }
            }
        }
    }

    println!("*** Flow statistics ***");
    for f in &spec.flows {
        let Some(stats) = report.stats.flow(f.flow_id) else {
            continue;
        };
        let active_s = (f.stop_ms.min(spec.until_ms).saturating_sub(f.start_ms)) as f64 / 1e3;
        let throughput_mbps = if active_s > 0.0 {
            stats.delivered_bytes as f64 * 8.0 / active_s / 1e6
        } else {
            0.0
        };
        println!(
            "  flow {} (priority {:?}): sent_pkts={} delivered_pkts={} dropped_pkts={} throughput={:.3} Mbps",
            f.flow_id,
            f.priority,
            stats.sent_pkts,
            stats.delivered_pkts,
            stats.dropped_pkts,
            throughput_mbps
        );
    }

    println!("*** TC layer statistics ***");
    println!(
        "  root: dropped={} requeued={} in_queue={}",
        report.qdisc.n_total_dropped_packets,
        report.qdisc.n_total_requeued_packets,
        report.qdisc_packets_in_queue
    );
    for (band, stats) in report.classes.iter().enumerate() {
        println!(
            "  band {band}: enqueued={} dequeued={} dropped={}",
            stats.n_total_enqueued_packets,
            stats.n_total_dequeued_packets,
            stats.n_total_dropped_packets
        );
    }
    println!(
        "  device: tx_pkts={} dropped={}",
        report.device_tx_pkts, report.device_dropped_pkts
    );

    if let (Some(path), Some(trace)) = (&args.trace_json, &outcome.trace) {
        trace.write_json(path).expect("write trace json");
        println!("wrote trace events to {}", path.display());
    }
    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(report).expect("serialize summary");
        fs::write(path, json).expect("write summary json");
    }

    println!("done @ {} ns", report.final_time_ns);
}
