// Standalone Rust benchmark for CSV writer throughput.
//
// Run: cargo bench --bench encode_bench
//
// Compares the crate's Writer (SIMD-classified quoting decision) against a
// naive per-field encoder across clean, mixed, and long-field datasets.

use std::time::{Duration, Instant};

use fastcsv::{Writer, WriterConfig};

/// Naive encoder: no vectorized quoting check, just a linear byte scan and
/// per-field allocation. A reasonable lower bound for "the straightforward
/// thing to write without this crate".
fn encode_csv_naive(rows: &[&[&[u8]]], separator: u8, quote: u8, line_sep: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            let needs_quoting = field
                .iter()
                .any(|&b| b == separator || b == quote || b == b'\n' || b == b'\r');
            if needs_quoting {
                out.push(quote);
                for &b in *field {
                    if b == quote {
                        out.push(quote);
                    }
                    out.push(b);
                }
                out.push(quote);
            } else {
                out.extend_from_slice(field);
            }
        }
        out.extend_from_slice(line_sep);
    }
    out
}

fn encode_csv_writer(rows: &[&[&[u8]]]) -> Vec<u8> {
    let config = WriterConfig::default().build().expect("default config is valid");
    let mut out = Vec::new();
    {
        let mut writer = Writer::new(&mut out, config);
        for row in rows {
            writer.write_row(row.iter().copied()).expect("write to Vec<u8> cannot fail");
        }
        writer.flush().expect("flush to Vec<u8> cannot fail");
    }
    out
}

fn generate_clean_rows(num_rows: usize, fields_per_row: usize) -> Vec<Vec<Vec<u8>>> {
    (0..num_rows)
        .map(|i| {
            (0..fields_per_row)
                .map(|j| format!("field_{i}_{j}_value").into_bytes())
                .collect()
        })
        .collect()
}

fn generate_mixed_rows(num_rows: usize, fields_per_row: usize) -> Vec<Vec<Vec<u8>>> {
    (0..num_rows)
        .map(|i| {
            (0..fields_per_row)
                .map(|j| match j % 5 {
                    0 => format!("plain_value_{i}").into_bytes(),
                    1 => format!("has,comma_{i}").into_bytes(),
                    2 => format!("has\"quote_{i}").into_bytes(),
                    3 => format!("has\nnewline_{i}").into_bytes(),
                    _ => format!("normal_field_{i}_{j}").into_bytes(),
                })
                .collect()
        })
        .collect()
}

fn generate_long_field_rows(num_rows: usize) -> Vec<Vec<Vec<u8>>> {
    (0..num_rows)
        .map(|i| {
            vec![
                format!("{i:0>100}").into_bytes(),
                {
                    let mut f = format!("{i:a>198}").into_bytes();
                    f[195] = b',';
                    f
                },
                format!("{i:x>50}").into_bytes(),
            ]
        })
        .collect()
}

struct BenchResult {
    name: String,
    iterations: u64,
    total_time: Duration,
    output_size: usize,
}

impl BenchResult {
    fn avg_ns(&self) -> f64 {
        self.total_time.as_nanos() as f64 / self.iterations as f64
    }

    fn throughput_mb_s(&self) -> f64 {
        let bytes_per_iter = self.output_size as f64;
        let secs_per_iter = self.avg_ns() / 1_000_000_000.0;
        bytes_per_iter / secs_per_iter / 1_000_000.0
    }
}

fn bench_fn<F: Fn() -> Vec<u8>>(name: &str, f: F, warmup_secs: f64, bench_secs: f64) -> BenchResult {
    let warmup_deadline = Instant::now() + Duration::from_secs_f64(warmup_secs);
    let mut output_size = 0;
    while Instant::now() < warmup_deadline {
        let out = f();
        output_size = out.len();
    }

    let mut iterations: u64 = 0;
    let start = Instant::now();
    let deadline = start + Duration::from_secs_f64(bench_secs);
    while Instant::now() < deadline {
        let _ = f();
        iterations += 1;
    }
    let total_time = start.elapsed();

    BenchResult {
        name: name.to_string(),
        iterations,
        total_time,
        output_size,
    }
}

fn print_results(results: &[BenchResult]) {
    let max_name_len = results.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let fastest_ns = results.iter().map(|r| r.avg_ns()).fold(f64::MAX, f64::min);

    for r in results {
        let avg = r.avg_ns();
        let speedup = avg / fastest_ns;
        let marker = if (speedup - 1.0).abs() < 0.01 { " (fastest)" } else { "" };
        println!(
            "  {:<width$}  {:>10.2} µs/iter  {:>8.1} MB/s  {:>6.2}x{}",
            r.name,
            avg / 1000.0,
            r.throughput_mb_s(),
            speedup,
            marker,
            width = max_name_len,
        );
    }
}

fn run_benchmark_suite(label: &str, rows_owned: &[Vec<Vec<u8>>], warmup: f64, time: f64) {
    let row_fields: Vec<Vec<&[u8]>> = rows_owned
        .iter()
        .map(|row| row.iter().map(|f| f.as_slice()).collect())
        .collect();
    let row_slices: Vec<&[&[u8]]> = row_fields.iter().map(|r| r.as_slice()).collect();

    println!("\n--- {label} ---");

    let naive_out = encode_csv_naive(&row_slices, b',', b'"', b"\n");
    let writer_out = encode_csv_writer(&row_slices);
    assert_eq!(naive_out, writer_out, "Writer output differs from naive reference!");
    println!("  Output: {} bytes (naive and Writer match)", writer_out.len());

    let results = vec![
        bench_fn("Naive", || encode_csv_naive(&row_slices, b',', b'"', b"\n"), warmup, time),
        bench_fn("Writer", || encode_csv_writer(&row_slices), warmup, time),
    ];
    print_results(&results);
}

fn main() {
    println!("=== fastcsv Writer Benchmark ===");

    let warmup = 1.0;
    let time = 3.0;

    let rows = generate_clean_rows(1_000, 10);
    run_benchmark_suite("1K rows x 10 fields (clean, no quoting)", &rows, warmup, time);

    let rows = generate_clean_rows(10_000, 10);
    run_benchmark_suite("10K rows x 10 fields (clean, no quoting)", &rows, warmup, time);

    let rows = generate_mixed_rows(10_000, 10);
    run_benchmark_suite("10K rows x 10 fields (mixed, with quoting)", &rows, warmup, time);

    let rows = generate_mixed_rows(100_000, 10);
    run_benchmark_suite("100K rows x 10 fields (mixed, with quoting)", &rows, warmup, time);

    let rows = generate_long_field_rows(10_000);
    run_benchmark_suite("10K rows x 3 long fields (50-200 bytes each)", &rows, warmup, time);

    println!("\n=== Done ===");
}
