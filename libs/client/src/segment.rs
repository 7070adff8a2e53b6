//! # Segment Fetcher
//!
//! Sequential retrieval of a segmented object. The first Interest may
//! match any name under the prefix; once the producer's naming is known,
//! segments are fetched one by one until MetaInfo's FinalBlockId names the
//! segment just received. Per-segment timeouts retry up to a limit; a Nack
//! or validation failure aborts.

use std::sync::Arc;

use bytes::Bytes;
use codec::InterestParam;
use futures::stream::{unfold, Stream};
use security::Validator;
use tracing::debug;
use types::{component, Component, Name};

use crate::app::App;
use crate::error::{ClientError, ClientResult};

/// How the object's versioned name is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// A prefix-matching Interest; the Data's own name reveals the naming
    Direct,
    /// The RDR convention: a metadata Interest whose Data content carries
    /// the versioned name to fetch under
    Metadata,
}

/// Retrieval knobs
#[derive(Clone)]
pub struct SegmentFetcherOptions {
    /// Per-Interest lifetime in milliseconds
    pub lifetime: u64,
    /// Attempts per segment before giving up
    pub retry_times: u32,
    pub must_be_fresh: bool,
    pub discovery: Discovery,
    pub validator: Arc<dyn Validator>,
}

impl Default for SegmentFetcherOptions {
    fn default() -> Self {
        Self {
            lifetime: 4000,
            retry_times: 3,
            must_be_fresh: true,
            discovery: Discovery::Direct,
            validator: security::pass_all(),
        }
    }
}

enum FetchState {
    /// Resolve the versioned name through an RDR metadata Interest
    Discover(Name),
    /// Discover the producer's naming with a prefix-matching Interest
    First(Name),
    /// Fetch segment `seg` under `base`
    Segment { base: Name, seg: u64 },
    Done,
}

async fn retry(
    app: &App,
    name: &Name,
    first: bool,
    options: &SegmentFetcherOptions,
) -> ClientResult<crate::app::DataResult> {
    let param = InterestParam {
        can_be_prefix: first,
        must_be_fresh: options.must_be_fresh,
        nonce: Some(crate::utils::gen_nonce()),
        lifetime: Some(options.lifetime),
        ..Default::default()
    };
    let mut trial = 0;
    loop {
        match app
            .express(name, param.clone(), None, None, options.validator.clone())
            .await
        {
            Err(e @ (ClientError::Timeout | ClientError::Nack { .. })) => {
                trial += 1;
                debug!(name = %name, trial, error = %e, "segment interest unanswered");
                if trial >= options.retry_times {
                    return Err(e);
                }
            }
            other => return other,
        }
    }
}

/// Fetch a segmented object, yielding segment contents in order
pub fn segment_fetcher(
    app: App,
    name: Name,
    options: SegmentFetcherOptions,
) -> impl Stream<Item = ClientResult<Bytes>> {
    let initial = match options.discovery {
        Discovery::Direct => FetchState::First(name),
        Discovery::Metadata => FetchState::Discover(name),
    };
    unfold(initial, move |mut state| {
        let app = app.clone();
        let options = options.clone();
        async move {
            loop {
                match state {
                    FetchState::Done => return None,
                    FetchState::Discover(name) => {
                        let meta_name = name.appending(
                            Component::from_bytes_typed(b"metadata", component::TYPE_KEYWORD)
                                .expect("keyword type is in range"),
                        );
                        let (_, content, _) = match retry(&app, &meta_name, true, &options).await {
                            Ok(result) => result,
                            Err(e) => return Some((Err(e), FetchState::Done)),
                        };
                        let versioned = match content.as_ref().map(Name::from_wire) {
                            Some(Ok(versioned)) => versioned,
                            _ => {
                                return Some((
                                    Err(ClientError::Codec(
                                        types::DecodeError::Malformed(
                                            "metadata content is not a name".into(),
                                        )
                                        .into(),
                                    )),
                                    FetchState::Done,
                                ))
                            }
                        };
                        state = FetchState::First(versioned);
                    }
                    FetchState::First(name) => {
                        let (data_name, content, ctx) =
                            match retry(&app, &name, true, &options).await {
                                Ok(result) => result,
                                Err(e) => return Some((Err(e), FetchState::Done)),
                            };
                        let content = content.unwrap_or_else(Bytes::new);
                        let Some(last) = data_name.last() else {
                            return Some((Ok(content), FetchState::Done));
                        };
                        if last.typ() != component::TYPE_SEGMENT {
                            // Unsegmented object
                            return Some((Ok(content), FetchState::Done));
                        }
                        let final_block = ctx
                            .meta_info
                            .as_ref()
                            .and_then(|m| m.final_block_id.clone());
                        let base = data_name.prefix(data_name.len() - 1);
                        if last.to_number() == 0 {
                            if final_block.as_deref() == Some(last.wire()) {
                                return Some((Ok(content), FetchState::Done));
                            }
                            return Some((Ok(content), FetchState::Segment { base, seg: 1 }));
                        }
                        // Landed mid-object; restart from segment zero
                        state = FetchState::Segment { base, seg: 0 };
                    }
                    FetchState::Segment { base, seg } => {
                        let seg_comp = Component::from_segment(seg);
                        let name = base.appending(seg_comp.clone());
                        let (_, content, ctx) = match retry(&app, &name, false, &options).await {
                            Ok(result) => result,
                            Err(e) => return Some((Err(e), FetchState::Done)),
                        };
                        let content = content.unwrap_or_else(Bytes::new);
                        let final_block = ctx
                            .meta_info
                            .as_ref()
                            .and_then(|m| m.final_block_id.clone());
                        let next = if final_block.as_deref() == Some(seg_comp.wire()) {
                            FetchState::Done
                        } else {
                            FetchState::Segment {
                                base,
                                seg: seg + 1,
                            }
                        };
                        return Some((Ok(content), next));
                    }
                }
            }
        }
    })
}
