#[cfg(test)]
mod pipeline_tests {
    use crate::config::{CachePolicy, FreqConfig};
    use crate::locus::LocusCombination;
    use crate::pipeline::make_freqs;
    use crate::tests::populations;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    const HAPLO_1: &str =
        "A*01:01~C*07:01~B*08:01~DRB3*01:01~DRB1*03:01~DQB1*02:01~DQA1*05:01~DPA1*01:03~DPB1*04:01";
    const HAPLO_2: &str =
        "A*02:01~C*05:01~B*44:02~DRB4*01:01~DRB1*04:01~DQB1*03:01~DQA1*03:01~DPA1*01:03~DPB1*04:01";

    fn write_freqs(dir: &Path, population: &str, rows: &[(&str, f64)]) {
        let file = File::create(dir.join(format!("{}.freqs.gz", population))).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        writeln!(encoder, "Haplo,Freq").unwrap();
        for (haplo, freq) in rows {
            writeln!(encoder, "{},{}", haplo, freq).unwrap();
        }
        encoder.finish().unwrap();
    }

    fn config_for(root: &Path, pops: &[&str], top_n: usize) -> FreqConfig {
        let mut config = FreqConfig::reference().unwrap();
        config.populations = populations(pops);
        config.combinations = vec![LocusCombination::parse("A").unwrap()];
        config.top_n = top_n;
        config.freqs_dir = root.join("freqs");
        config.output_dir = root.join("reports");
        config.cache = CachePolicy::ReadWrite {
            dir: root.join("cache"),
        };
        config
    }

    fn setup(root: &Path) {
        let freqs = root.join("freqs");
        fs::create_dir(&freqs).unwrap();
        write_freqs(&freqs, "AFA", &[(HAPLO_1, 0.25), (HAPLO_2, 0.125)]);
        write_freqs(&freqs, "CAU", &[(HAPLO_1, 0.5)]);
    }

    #[test]
    fn test_larger_bound_rebuilds_truncated_cache() {
        let dir = tempdir().unwrap();
        setup(dir.path());

        let first = make_freqs(&config_for(dir.path(), &["AFA", "CAU"], 1)).unwrap();
        assert_eq!(first.master_rows, 1);
        assert!(!first.loaded_from_cache);

        let wider = make_freqs(&config_for(dir.path(), &["AFA", "CAU"], 100)).unwrap();
        assert_eq!(wider.master_rows, 2);
        assert!(!wider.loaded_from_cache);
        assert_eq!(wider.reports[0].rows, 2);

        // The rebuilt cache holds every merged row, so any bound reuses it
        let again = make_freqs(&config_for(dir.path(), &["AFA", "CAU"], 50)).unwrap();
        assert_eq!(again.master_rows, 2);
        assert!(again.loaded_from_cache);

        let narrower = make_freqs(&config_for(dir.path(), &["AFA", "CAU"], 1)).unwrap();
        assert_eq!(narrower.master_rows, 1);
        assert!(narrower.loaded_from_cache);
    }

    #[test]
    fn test_population_change_rebuilds_cache() {
        let dir = tempdir().unwrap();
        setup(dir.path());

        let both = make_freqs(&config_for(dir.path(), &["AFA", "CAU"], 100)).unwrap();
        assert!(!both.loaded_from_cache);

        let reordered = make_freqs(&config_for(dir.path(), &["CAU", "AFA"], 100)).unwrap();
        assert!(reordered.loaded_from_cache);

        let only_cau = make_freqs(&config_for(dir.path(), &["CAU"], 100)).unwrap();
        assert!(!only_cau.loaded_from_cache);
        assert_eq!(only_cau.master_rows, 1);

        let report = fs::read_to_string(dir.path().join("reports").join("A.csv")).unwrap();
        assert_eq!(report.lines().next().unwrap(), "Haplotype,CAU,TotalFreq");
    }
}
