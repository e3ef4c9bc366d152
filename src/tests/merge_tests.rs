#[cfg(test)]
mod merge_tests {
    use crate::error::FreqError;
    use crate::merge::*;
    use crate::tests::{assert_close, populations, schema_of, source};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    #[test]
    fn test_two_population_scenario() {
        let pops = populations(&["Pop1", "Pop2"]);
        let schema = schema_of(&["K"]);
        let sources = vec![
            source("Pop1", &[("K1", 0.002)]),
            source("Pop2", &[("K1", 0.001), ("K2", 0.0005)]),
        ];

        let table = merge_population_sources(&pops, &schema, &sources).unwrap();
        assert_eq!(table.len(), 2);

        let k1 = table.get("K1").unwrap();
        assert_eq!(k1.freqs, vec![0.002, 0.001]);
        assert_close(k1.total, 0.003);

        let k2 = table.get("K2").unwrap();
        assert_eq!(k2.freqs, vec![0.0, 0.0005]);
        assert_close(k2.total, 0.0005);
    }

    #[test]
    fn test_merge_completeness_and_totals() {
        let pops = populations(&["AFA", "CAU", "HIS"]);
        let schema = schema_of(&["A", "B"]);
        let sources = vec![
            source("AFA", &[("A*01~B*08", 0.1), ("A*02~B*07", 0.2)]),
            source("CAU", &[("A*02~B*07", 0.05), ("A*03~B*44", 0.3)]),
            source("HIS", &[("A*24~B*35", 0.4)]),
        ];
        let table = merge_population_sources(&pops, &schema, &sources).unwrap();

        // Every key seen once, in first-seen order
        let keys: Vec<&str> = table.rows().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A*01~B*08", "A*02~B*07", "A*03~B*44", "A*24~B*35"]);

        for src in &sources {
            let column = table.population_index(&src.population).unwrap();
            for (key, freq) in &src.entries {
                assert_eq!(table.get(key).unwrap().freqs[column], *freq);
            }
        }
        // Absent entries are zero
        assert_eq!(table.get("A*24~B*35").unwrap().freqs, vec![0.0, 0.0, 0.4]);

        for row in table.rows() {
            assert_eq!(row.total, row.row_sum());
        }
    }

    #[test]
    fn test_merge_order_invariance() {
        let pops = populations(&["P1", "P2", "P3", "P4", "P5"]);
        let schema = schema_of(&["A", "B"]);
        let mut rng = StdRng::seed_from_u64(7);

        let mut sources: Vec<PopulationSource> = pops
            .iter()
            .map(|p| {
                let mut entries = Vec::new();
                for i in 0..50 {
                    if rng.gen_bool(0.6) {
                        let freq: f64 = rng.gen_range(0.0..0.01);
                        entries.push((format!("A*{:02}~B*{:02}", i % 7, i), freq));
                    }
                }
                PopulationSource::new(p.clone(), entries)
            })
            .collect();

        let reference = merge_population_sources(&pops, &schema, &sources).unwrap();
        let as_map = |t: &crate::table::FrequencyTable| -> HashMap<String, Vec<f64>> {
            t.rows().iter().map(|r| (r.key.clone(), r.freqs.clone())).collect()
        };
        let expected = as_map(&reference);

        for _ in 0..5 {
            sources.shuffle(&mut rng);
            let shuffled = merge_population_sources(&pops, &schema, &sources).unwrap();
            assert_eq!(as_map(&shuffled), expected);
        }
    }

    #[test]
    fn test_negative_or_nan_frequency_is_fatal() {
        let pops = populations(&["P1"]);
        let schema = schema_of(&["K"]);

        let negative = vec![source("P1", &[("K1", -0.1)])];
        assert!(matches!(
            merge_population_sources(&pops, &schema, &negative),
            Err(FreqError::MalformedInput(_))
        ));

        let nan = vec![source("P1", &[("K1", f64::NAN)])];
        assert!(matches!(
            merge_population_sources(&pops, &schema, &nan),
            Err(FreqError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        let pops = populations(&["P1"]);
        let schema = schema_of(&["A", "B", "C"]);
        let sources = vec![source("P1", &[("A*01~B*08", 0.1)])];
        assert!(matches!(
            merge_population_sources(&pops, &schema, &sources),
            Err(FreqError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_unknown_or_repeated_population_is_config_error() {
        let pops = populations(&["P1"]);
        let schema = schema_of(&["K"]);

        let unknown = vec![source("P9", &[("K1", 0.1)])];
        assert!(matches!(
            merge_population_sources(&pops, &schema, &unknown),
            Err(FreqError::Config(_))
        ));

        let repeated = vec![source("P1", &[("K1", 0.1)]), source("P1", &[("K2", 0.1)])];
        assert!(matches!(
            merge_population_sources(&pops, &schema, &repeated),
            Err(FreqError::Config(_))
        ));
    }

    #[test]
    fn test_repeated_key_within_population_is_summed() {
        let pops = populations(&["P1", "P2"]);
        let schema = schema_of(&["K"]);
        let sources = vec![
            source("P1", &[("K1", 0.25), ("K1", 0.5)]),
            source("P2", &[("K1", 0.125)]),
        ];
        let table = merge_population_sources(&pops, &schema, &sources).unwrap();
        let row = table.get("K1").unwrap();
        assert_eq!(row.freqs, vec![0.75, 0.125]);
        assert_eq!(row.total, 0.875);
    }

    #[test]
    fn test_empty_sources() {
        let pops = populations(&["P1", "P2"]);
        let schema = schema_of(&["K"]);
        let table = merge_population_sources(&pops, &schema, &[]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.populations(), &["P1", "P2"]);
    }
}
