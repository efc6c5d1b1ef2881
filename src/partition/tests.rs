//! Partition Module Tests
//!
//! ## Test Scopes
//! - **Sizing**: Effective part count and balanced part sizes.
//! - **Strategies**: Linear and binary planning agree on every assignment.
//! - **Output**: Written parts are standalone documents whose records concatenate back
//!   to the source.
//! - **Errors**: Missing root, unterminated, nested and stray records, rejected the same
//!   way by both strategies.

#[cfg(test)]
mod tests {
    use crate::partition::partitioner::Partitioner;
    use crate::partition::planner::{cut_targets, effective_parts, part_sizes};
    use crate::partition::types::*;
    use crate::partition::writer::read_manifest;
    use std::io::Cursor;
    use std::path::Path;

    const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<osm-notes version=\"0.6\">\n";
    const FOOTER: &str = "</osm-notes>\n";

    /// Builds a notes document with `count` records of uneven length.
    fn notes_document(count: usize) -> String {
        let mut doc = String::from(HEADER);
        for i in 1..=count {
            doc.push_str(&format!(
                "  <note id=\"{}\" lat=\"{}.5\" lon=\"-{}.25\"><comment>{}</comment></note>\n",
                i,
                i % 90,
                i % 180,
                "x".repeat(i % 7)
            ));
        }
        doc.push_str(FOOTER);
        doc
    }

    /// Record ids in document order.
    fn ids_in(text: &str) -> Vec<u64> {
        text.split("<note id=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next()?.parse().ok())
            .collect()
    }

    fn partitioner(block_size: usize) -> Partitioner {
        Partitioner::new(PartitionConfig {
            block_size,
            ..PartitionConfig::default()
        })
    }

    fn plan(doc: &str, block_size: usize, request: PartitionRequest) -> Result<PartitionPlan, PartitionError> {
        let mut source = Cursor::new(doc.as_bytes().to_vec());
        partitioner(block_size).plan(&mut source, &request)
    }

    fn write_doc(dir: &Path, name: &str, doc: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, doc).unwrap();
        path
    }

    // ============================================================
    // SIZING TESTS
    // ============================================================

    #[test]
    fn test_effective_parts_never_exceeds_records() {
        assert_eq!(effective_parts(3, 10, 1), 3);
        assert_eq!(effective_parts(0, 10, 1), 0);
        assert_eq!(effective_parts(10, 0, 1), 1);
    }

    #[test]
    fn test_effective_parts_respects_min_records() {
        assert_eq!(effective_parts(10_000, 8, 20), 8);
        assert_eq!(effective_parts(10, 8, 5), 2);
        // Too few records for the floor: one part rather than none
        assert_eq!(effective_parts(3, 8, 20), 1);
    }

    #[test]
    fn test_part_sizes_differ_by_at_most_one() {
        assert_eq!(part_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(part_sizes(10_000, 8), vec![1250; 8]);
        assert_eq!(part_sizes(3, 3), vec![1, 1, 1]);
        assert!(part_sizes(5, 0).is_empty());

        for total in 1..60 {
            for parts in 1..=total.min(9) {
                let sizes = part_sizes(total, parts);
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(max - min <= 1);
                assert!(min >= 1);
                assert_eq!(sizes.iter().sum::<usize>(), total);
            }
        }
    }

    #[test]
    fn test_cut_targets_are_cumulative() {
        assert_eq!(cut_targets(&[4, 3, 3]), vec![4, 7]);
        assert!(cut_targets(&[5]).is_empty());
    }

    // ============================================================
    // STRATEGY TESTS
    // ============================================================

    #[test]
    fn test_linear_and_binary_agree() {
        let doc = notes_document(50);

        for target in 1..=9 {
            let request = PartitionRequest::new(target, 1, 4);
            let linear = plan(&doc, 64, request.clone().with_strategy(PartitionStrategy::Linear)).unwrap();
            let binary = plan(&doc, 64, request.with_strategy(PartitionStrategy::Binary)).unwrap();

            assert_eq!(linear.total_records, 50);
            assert_eq!(binary.total_records, 50);
            assert_eq!(linear.header, binary.header);
            assert_eq!(linear.footer, binary.footer);
            assert_eq!(linear.parts, binary.parts, "plans differ for {} parts", target);
        }
    }

    #[test]
    fn test_binary_agrees_across_block_sizes() {
        let doc = notes_document(200);
        let request = PartitionRequest::new(7, 1, 4);
        let reference = plan(&doc, 1024 * 1024, request.clone().with_strategy(PartitionStrategy::Linear)).unwrap();

        for block_size in [64, 100, 257, 4096] {
            let binary = plan(&doc, block_size, request.clone().with_strategy(PartitionStrategy::Binary)).unwrap();
            assert_eq!(binary.parts, reference.parts, "block size {}", block_size);
        }
    }

    #[test]
    fn test_binary_plan_counts_boundary_seeks() {
        let doc = notes_document(100);
        let request = PartitionRequest::new(4, 1, 4).with_strategy(PartitionStrategy::Binary);
        let plan = plan(&doc, 256, request).unwrap();

        assert_eq!(plan.strategy, PartitionStrategy::Binary);
        assert!(plan.seeks > 0);
    }

    #[test]
    fn test_ten_thousand_records_split_evenly() {
        let doc = notes_document(10_000);
        let request = PartitionRequest::new(8, 20, 8);

        for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
            let plan = plan(&doc, 4096, request.clone().with_strategy(strategy)).unwrap();
            assert_eq!(plan.parts.len(), 8);
            assert!(plan.parts.iter().all(|p| p.record_count == 1250));
        }
    }

    #[test]
    fn test_auto_strategy_selection() {
        let partitioner = Partitioner::new(PartitionConfig {
            binary_threshold_bytes: 1000,
            ..PartitionConfig::default()
        });

        let parallel = PartitionRequest::new(4, 1, 4);
        assert_eq!(partitioner.choose_strategy(2000, &parallel), PartitionStrategy::Binary);
        assert_eq!(partitioner.choose_strategy(999, &parallel), PartitionStrategy::Linear);

        let serial = PartitionRequest::new(4, 1, 1);
        assert_eq!(partitioner.choose_strategy(2000, &serial), PartitionStrategy::Linear);

        let single_part = PartitionRequest::new(1, 1, 4);
        assert_eq!(partitioner.choose_strategy(2000, &single_part), PartitionStrategy::Linear);

        let forced = PartitionRequest::new(4, 1, 4).with_strategy(PartitionStrategy::Linear);
        assert_eq!(partitioner.choose_strategy(2000, &forced), PartitionStrategy::Linear);
    }

    #[test]
    fn test_similar_element_names_are_not_records() {
        let doc = concat!(
            "<notes>\n",
            "<note id=\"1\"><note_comment>a</note_comment></note>\n",
            "<note_comment>outside</note_comment>\n",
            "<note id=\"2\"></note>\n",
            "</notes>\n",
        );

        for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
            let plan = plan(doc, 64, PartitionRequest::new(2, 1, 2).with_strategy(strategy)).unwrap();
            assert_eq!(plan.root, "notes");
            assert_eq!(plan.total_records, 2);
            assert_eq!(plan.parts.len(), 2);
        }
    }

    // ============================================================
    // OUTPUT TESTS
    // ============================================================

    #[test]
    fn test_partitions_are_standalone_and_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let doc = notes_document(37);
        let input = write_doc(dir.path(), "notes.xml", &doc);

        for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
            let out = dir.path().join(format!("{:?}", strategy));
            let request = PartitionRequest::new(5, 1, 4).with_strategy(strategy);
            let outcome = partitioner(128).partition(&input, &out, &request).unwrap();

            let PartitionOutcome::Split(set) = outcome else {
                panic!("expected partitions");
            };
            assert_eq!(set.len(), 5);
            assert_eq!(set.total_records, 37);

            let mut ids = Vec::new();
            for (expected_index, partition) in set.partitions.iter().enumerate() {
                assert_eq!(partition.index, expected_index);
                let text = std::fs::read_to_string(&partition.path).unwrap();
                assert!(text.starts_with(HEADER.trim_end()), "part {} lost its header", partition.index);
                assert!(text.ends_with(FOOTER), "part {} lost its footer", partition.index);
                assert_eq!(text.matches("<note ").count(), partition.record_count);
                assert_eq!(text.matches("</note>").count(), partition.record_count);
                ids.extend(ids_in(&text));
            }
            assert_eq!(ids, (1..=37).collect::<Vec<u64>>());
        }
    }

    #[test]
    fn test_more_parts_than_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path(), "notes.xml", &notes_document(3));

        let outcome = partitioner(64)
            .partition(&input, dir.path(), &PartitionRequest::new(10, 1, 4))
            .unwrap();

        let counts: Vec<usize> = outcome.partitions().iter().map(|p| p.record_count).collect();
        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[test]
    fn test_manifest_and_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path(), "notes.xml", &notes_document(12));

        let PartitionOutcome::Split(set) = partitioner(64)
            .partition(&input, dir.path(), &PartitionRequest::new(3, 1, 2))
            .unwrap()
        else {
            panic!("expected partitions");
        };

        let run_name = set.run_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(run_name.starts_with("run-"));
        assert!(set.partitions[0].path.ends_with("part_0000.xml"));
        assert!(set.partitions[2].path.ends_with("part_0002.xml"));

        let manifest = read_manifest(&set.manifest_path()).unwrap();
        assert_eq!(manifest.partitions, set.partitions);
        assert_eq!(manifest.total_records, 12);
    }

    #[test]
    fn test_remove_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path(), "notes.xml", &notes_document(6));

        let PartitionOutcome::Split(set) = partitioner(64)
            .partition(&input, dir.path(), &PartitionRequest::new(2, 1, 2))
            .unwrap()
        else {
            panic!("expected partitions");
        };

        set.remove(0).unwrap();
        assert!(!set.partitions[0].path.exists());
        assert!(set.partitions[1].path.exists());
        // Removing twice is fine
        set.remove(0).unwrap();

        set.cleanup().unwrap();
        assert!(!set.run_dir.exists());
        set.cleanup().unwrap();
    }

    #[test]
    fn test_every_planned_part_holds_whole_records() {
        for count in 1..=40 {
            let doc = notes_document(count);
            for target in 1..=6 {
                for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
                    let request = PartitionRequest::new(target, 1, 4).with_strategy(strategy);
                    let plan = plan(&doc, 64, request).unwrap();

                    assert_eq!(plan.parts.len(), target.min(count));
                    for part in &plan.parts {
                        let body = doc[part.range.start as usize..part.range.end as usize].trim();
                        assert!(body.starts_with("<note "), "{:?} part {} of {}", strategy, part.index, count);
                        assert!(body.ends_with("</note>"), "{:?} part {} of {}", strategy, part.index, count);
                        assert_eq!(body.matches("<note ").count(), part.record_count);
                        assert_eq!(body.matches("</note>").count(), part.record_count);
                    }
                }
            }
        }
    }

    #[test]
    fn test_long_prologue_before_root() {
        let prologue = format!("<?xml version=\"1.0\"?>\n<!-- {} -->\n", "x".repeat(100 * 1024));
        let doc = notes_document(6).replacen("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n", &prologue, 1);
        let empty = format!("{}<osm-notes>\n</osm-notes>\n", prologue);

        for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
            let request = PartitionRequest::new(3, 1, 4).with_strategy(strategy);
            let found = plan(&doc, 4096, request.clone()).unwrap();
            assert_eq!(found.root, "osm-notes");
            assert_eq!(found.total_records, 6);

            let nothing = plan(&empty, 4096, request).unwrap();
            assert!(nothing.is_empty());
            assert_eq!(nothing.root, "osm-notes");
        }
    }

    // ============================================================
    // EMPTY INPUT TESTS
    // ============================================================

    #[test]
    fn test_documents_without_records_are_nothing_to_do() {
        let docs = [
            "<?xml version=\"1.0\"?>\n<osm-notes version=\"0.6\">\n</osm-notes>\n",
            "<osm-notes/>",
            "   \n\t",
            "",
        ];

        for doc in docs {
            for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
                let plan = plan(doc, 64, PartitionRequest::new(4, 1, 4).with_strategy(strategy)).unwrap();
                assert!(plan.is_empty(), "{:?} should have no records", doc);
                assert!(plan.parts.is_empty());
            }
        }
    }

    #[test]
    fn test_nothing_to_do_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_doc(dir.path(), "empty.xml", "<osm-notes>\n</osm-notes>\n");
        let out = dir.path().join("out");

        let outcome = partitioner(64)
            .partition(&input, &out, &PartitionRequest::new(4, 1, 4))
            .unwrap();

        assert!(matches!(outcome, PartitionOutcome::NothingToDo));
        assert!(outcome.partitions().is_empty());
        assert!(!out.exists());
    }

    // ============================================================
    // ERROR TESTS
    // ============================================================

    #[test]
    fn test_missing_root_is_rejected() {
        let docs = [
            "<note id=\"1\"></note>\n<note id=\"2\"></note>\n",
            "<osm-notes>\n<note id=\"1\"></note>\n",
            "plain text, no markup at all",
        ];

        for doc in docs {
            for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
                let result = plan(doc, 64, PartitionRequest::new(2, 1, 2).with_strategy(strategy));
                assert!(
                    matches!(result, Err(PartitionError::MissingRoot)),
                    "{:?} with {:?} gave {:?}",
                    doc,
                    strategy,
                    result.map(|p| p.total_records)
                );
            }
        }
    }

    /// Plans `doc` with both strategies and returns the two error messages.
    fn both_errors(doc: &str, block_size: usize) -> (String, String) {
        let error = |strategy| {
            let request = PartitionRequest::new(2, 1, 2).with_strategy(strategy);
            match plan(doc, block_size, request) {
                Ok(plan) => panic!("{:?} accepted a malformed document: {:?}", strategy, plan.parts),
                Err(e) => e.to_string(),
            }
        };
        (error(PartitionStrategy::Linear), error(PartitionStrategy::Binary))
    }

    #[test]
    fn test_unterminated_record_is_rejected() {
        let doc = "<osm-notes><note id=\"1\"></note><note id=\"2\"></osm-notes>";

        for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
            let result = plan(doc, 64, PartitionRequest::new(2, 1, 2).with_strategy(strategy));
            assert!(
                matches!(result, Err(PartitionError::UnterminatedRecord { offset: 31 })),
                "{:?} gave {:?}",
                strategy,
                result.map(|p| p.parts)
            );
        }
    }

    #[test]
    fn test_nested_record_is_rejected_by_both_strategies() {
        let doc = "<osm-notes><note id=\"1\"><note id=\"2\"></note></note></osm-notes>";

        for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
            let result = plan(doc, 64, PartitionRequest::new(2, 1, 2).with_strategy(strategy));
            assert!(
                matches!(result, Err(PartitionError::UnterminatedRecord { offset: 11 })),
                "{:?} gave {:?}",
                strategy,
                result.map(|p| p.parts)
            );
        }
    }

    #[test]
    fn test_stray_end_marker_is_rejected() {
        let docs = [
            "<osm-notes></note><note id=\"1\"></note></osm-notes>",
            // Balanced counts, wrong order
            "<osm-notes></note><note id=\"1\"></note><note id=\"2\"></osm-notes>",
        ];

        for doc in docs {
            for strategy in [PartitionStrategy::Linear, PartitionStrategy::Binary] {
                let result = plan(doc, 64, PartitionRequest::new(2, 1, 2).with_strategy(strategy));
                assert!(
                    matches!(result, Err(PartitionError::UnexpectedEnd { offset: 11 })),
                    "{:?} with {:?} gave {:?}",
                    doc,
                    strategy,
                    result.map(|p| p.parts)
                );
            }
        }
    }

    #[test]
    fn test_misordered_records_fail_identically_across_blocks() {
        let doc = notes_document(30);
        let record_starts: Vec<usize> = doc.match_indices("<note ").map(|(at, _)| at).collect();
        let record_ends: Vec<usize> = doc.match_indices("</note>").map(|(at, _)| at).collect();

        for k in [0, 7, 15, 29] {
            // Record k loses its end marker: the next record nests inside it
            let mut unclosed = doc.clone();
            unclosed.replace_range(record_ends[k]..record_ends[k] + "</note>".len(), "");

            // Record k closes twice
            let mut doubled = doc.clone();
            doubled.insert_str(record_ends[k], "</note>");

            // Record k's end marker moves in front of it, keeping the counts balanced
            let mut swapped = doc.clone();
            swapped.replace_range(record_ends[k]..record_ends[k] + "</note>".len(), "");
            swapped.insert_str(record_starts[k], "</note>");

            for malformed in [&unclosed, &doubled, &swapped] {
                for block_size in [64, 100, 257, 4096] {
                    let (linear, binary) = both_errors(malformed, block_size);
                    assert_eq!(linear, binary, "record {} at block size {}", k, block_size);
                }
            }
        }
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = partitioner(64).partition(
            &dir.path().join("absent.xml"),
            dir.path(),
            &PartitionRequest::new(2, 1, 2),
        );
        assert!(matches!(result, Err(PartitionError::Io(_))));
    }
}
