#[cfg(test)]
mod report_tests {
    use crate::aggregate::DerivedTable;
    use crate::locus::LocusCombination;
    use crate::report::*;
    use crate::summary::summarize_table;
    use crate::tests::table_of;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_report_label_rule() {
        let exactly_31 = "B".repeat(31);
        assert_eq!(report_label(&exactly_31), exactly_31);

        let thirty_two = "A".repeat(32);
        let label = report_label(&thirty_two);
        assert_eq!(label, format!("{}...", "A".repeat(28)));
        assert_eq!(label.len(), 31);

        let long = "A~C~B~DRBX~DRB1~DQA1~DQB1~DPB1~DPA1";
        assert_eq!(report_label(long), "A~C~B~DRBX~DRB1~DQA1~DQB1~DP...");
        assert_eq!(report_label("A~C~B"), "A~C~B");
    }

    #[test]
    fn test_report_file_names() {
        let (table, summary) = report_file_names("DRB1~DQB1");
        assert_eq!(table, "DRB1~DQB1.csv");
        assert_eq!(summary, "DRB1~DQB1-summary.csv");
    }

    #[test]
    fn test_write_table_and_summary_csv() {
        let dir = tempdir().unwrap();
        let table = table_of(
            &["AFA", "CAU"],
            &["A"],
            &[("01:01", &[0.25, 0.5]), ("02:01", &[0.0, 0.125])],
        );

        let table_path = dir.path().join("A.csv");
        write_table_csv(&table, &table_path).unwrap();
        let content = fs::read_to_string(&table_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Haplotype,AFA,CAU,TotalFreq");
        assert_eq!(lines[1], "01:01,0.25,0.5,0.75");
        assert_eq!(lines[2], "02:01,0,0.125,0.125");
        assert_eq!(lines.len(), 3);

        let summary_path = dir.path().join("A-summary.csv");
        write_summary_csv(&summarize_table(&table), &summary_path).unwrap();
        let summary = fs::read_to_string(&summary_path).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "statistic,AFA,CAU,TotalFreq");
        assert_eq!(lines[1], "count,2,2,2");
        assert_eq!(lines.last().unwrap(), &"sum,0.25,0.625,0.875");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_summary_of_empty_table_uses_na() {
        let dir = tempdir().unwrap();
        let table = table_of(&["AFA"], &["A"], &[]);
        let path = dir.path().join("empty-summary.csv");
        write_summary_csv(&summarize_table(&table), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("mean,NA,NA"));
        assert!(content.contains("sum,0,0"));
    }

    #[test]
    fn test_write_report_and_manifest() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("reports");
        ensure_output_dir(&output_dir).unwrap();

        let name = "A~C~B~DRBX~DRB1~DQA1~DQB1~DPB1~DPA1";
        let derived = DerivedTable {
            combination: LocusCombination::parse(name).unwrap(),
            table: table_of(&["AFA"], &["A"], &[("x", &[0.5])]),
            elapsed: Duration::from_millis(3),
        };

        let entry = write_report(&derived, &output_dir).unwrap();
        assert_eq!(entry.rows, 1);
        assert_eq!(entry.label, "A~C~B~DRBX~DRB1~DQA1~DQB1~DP...");
        assert!(entry.file.is_file());
        assert!(entry.summary_file.is_file());
        assert_eq!(entry.file, output_dir.join(format!("{}.csv", name)));

        let manifest = write_manifest(&[entry], &output_dir).unwrap();
        let content = fs::read_to_string(manifest).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "combination,label,rows,file,summary_file");
        assert_eq!(
            lines[1],
            format!("{},A~C~B~DRBX~DRB1~DQA1~DQB1~DP...,1,{}.csv,{}-summary.csv", name, name, name)
        );
    }

    #[test]
    fn test_preview_lists_top_rows() {
        let table = table_of(
            &["AFA", "CAU"],
            &["A"],
            &[("01:01", &[0.25, 0.5]), ("02:01", &[0.0, 0.125])],
        );
        let rendered = render_table_preview(&table, "A", 1);
        assert!(rendered.contains("01:01"));
        assert!(!rendered.contains("02:01"));
        assert!(rendered.contains("2/2"));
        assert!(rendered.contains("... and 1 more rows."));
    }
}
