//! Property-based tests for the context compressor
//!
//! - compression never grows a context
//! - under the threshold the context is returned exactly as it was
//! - pruning never keeps more than `retention_period` messages
//! - importance scores stay in `[0, 1]`

#[cfg(test)]
mod property_tests {
    use crate::cache::context_cache::tests::sample_context;
    use crate::compression::compressor::tests::compressor;
    use crate::types::{ChatMessage, Context};
    use proptest::prelude::*;

    // ============================================================================
    // Strategies for generating test data
    // ============================================================================

    fn message_text_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Yes.".to_string()),
            Just("How does the avatar remember things?".to_string()),
            Just("I'm absolutely thrilled about this!".to_string()),
            Just("I need to finish my homework tonight".to_string()),
            "[a-zA-Z ?!.]{1,300}",
        ]
    }

    fn context_strategy() -> impl Strategy<Value = Context> {
        prop::collection::vec(message_text_strategy(), 0..30).prop_map(|texts| {
            let mut context = sample_context("prop");
            context.immediate.recent_messages = texts.into_iter().map(ChatMessage::user).collect();
            context
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn compression_never_grows(
            context in context_strategy(),
            threshold in 0usize..8_000,
            retention in 0usize..15
        ) {
            let result = compressor(threshold, retention).compress_context(&context);
            prop_assert!(result.compressed_size <= result.original_size);
            prop_assert!(result.compression_ratio <= 1.0);
            prop_assert!(result.compression_ratio > 0.0);
        }

        #[test]
        fn under_threshold_is_identity(context in context_strategy(), retention in 0usize..15) {
            let threshold = context.layer_size();
            let result = compressor(threshold, retention).compress_context(&context);
            prop_assert_eq!(result.compression_ratio, 1.0);
            prop_assert_eq!(&result.retained_messages, &context.immediate.recent_messages);
        }

        #[test]
        fn retention_bound_respected(context in context_strategy(), retention in 1usize..10) {
            let result = compressor(0, retention).compress_context(&context);
            if result.metadata.compressed {
                prop_assert!(result.retained_messages.len() <= retention);
                prop_assert!(result.retained_messages.len() < context.immediate.recent_messages.len());
            } else {
                prop_assert_eq!(&result.retained_messages, &context.immediate.recent_messages);
            }
        }

        #[test]
        fn importance_in_unit_range(text in message_text_strategy(), position in 0usize..50, extra in 0usize..50) {
            let total = position + 1 + extra;
            let score = compressor(10_240, 10)
                .score_message_importance(&ChatMessage::user(text), position, total);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
