//! Computes per-media-section source deltas between two SDP snapshots.

use jingle_xmpp_parsers::{Content, RtpDescription, Source, SsrcGroup};
use xmpp_parsers::jingle::{ContentId, Creator};

use crate::sdp::{
  util::{parse_ssrc_group_line, parse_ssrc_line},
  Sdp,
};

/// The sources a media section gained, together with where they live.
#[derive(Debug, Clone)]
pub struct MediaDiff {
  /// Index of the media section in the snapshot.
  pub index: usize,

  /// The `a=mid` of the section.
  pub mid: String,

  /// The media kind of the section.
  pub media_kind: String,

  /// Sources present in one snapshot but not the other.
  pub sources: Vec<Source>,

  /// ssrc-groups present in one snapshot but not the other.
  pub groups: Vec<SsrcGroup>,
}

struct MediaSources {
  sources: Vec<Source>,
  groups: Vec<SsrcGroup>,
}

fn media_sources(sdp: &Sdp, index: usize) -> MediaSources {
  let block = &sdp.media[index];
  let mut sources: Vec<Source> = Vec::new();
  for line in Sdp::find_lines(block, "a=ssrc:") {
    if let Ok((id, parameter)) = parse_ssrc_line(line) {
      match sources.iter_mut().find(|source| source.id == id) {
        Some(source) => source.parameters.push(parameter),
        None => {
          let mut source = Source::new(id);
          source.parameters.push(parameter);
          sources.push(source);
        },
      }
    }
  }
  let groups = Sdp::find_lines(block, "a=ssrc-group:")
    .into_iter()
    .filter_map(|line| parse_ssrc_group_line(line).ok())
    .collect();
  MediaSources { sources, groups }
}

fn group_key(group: &SsrcGroup) -> (String, Vec<u32>) {
  let mut sources = group.sources.clone();
  sources.sort_unstable();
  (group.semantics.as_str().to_owned(), sources)
}

/// Compares the source sets of two snapshots, media section by media
/// section. [`SdpDiffer::new_media`] reports what `other` carries that
/// `mine` does not; running it both ways enumerates the full symmetric
/// difference.
pub struct SdpDiffer<'a> {
  mine: &'a Sdp,
  other: &'a Sdp,
}

impl<'a> SdpDiffer<'a> {
  pub fn new(mine: &'a Sdp, other: &'a Sdp) -> SdpDiffer<'a> {
    SdpDiffer { mine, other }
  }

  /// Sources and groups present in `other` but absent from `mine`, keyed by
  /// `(media index, ssrc)` and `(media index, semantics, sorted ssrcs)`.
  pub fn new_media(&self) -> Vec<MediaDiff> {
    let mut diffs = Vec::new();
    for index in 0..self.other.media.len() {
      let theirs = media_sources(self.other, index);
      let ours = if index < self.mine.media.len() {
        media_sources(self.mine, index)
      }
      else {
        MediaSources {
          sources: Vec::new(),
          groups: Vec::new(),
        }
      };

      let sources: Vec<Source> = theirs
        .sources
        .into_iter()
        .filter(|source| !ours.sources.iter().any(|mine| mine.id == source.id))
        .collect();
      let groups: Vec<SsrcGroup> = theirs
        .groups
        .into_iter()
        .filter(|group| {
          let key = group_key(group);
          !ours.groups.iter().any(|mine| group_key(mine) == key)
        })
        .collect();

      if sources.is_empty() && groups.is_empty() {
        continue;
      }
      diffs.push(MediaDiff {
        index,
        mid: self
          .other
          .mid_for_index(index)
          .unwrap_or_else(|| index.to_string()),
        media_kind: self
          .other
          .media_kind(index)
          .unwrap_or_default()
          .to_owned(),
        sources,
        groups,
      });
    }
    diffs
  }

  /// Render the delta as `<content/>` payloads for a source-add or
  /// source-remove notification. An empty vector means there is nothing to
  /// send.
  pub fn to_contents(&self, our_role: Creator) -> Vec<Content> {
    self
      .new_media()
      .into_iter()
      .map(|diff| {
        let mut description = RtpDescription::new(diff.media_kind);
        description.ssrcs = diff.sources;
        description.ssrc_groups = diff.groups;
        Content::new(our_role.clone(), ContentId(diff.mid)).with_description(description)
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const OLD: &str = "v=0\r\n\
s=-\r\n\
m=audio 1 RTP/SAVPF 111\r\n\
a=mid:audio\r\n\
a=ssrc:555 cname:local\r\n\
m=video 1 RTP/SAVPF 100\r\n\
a=mid:video\r\n\
a=ssrc:556 cname:local\r\n";

  const NEW: &str = "v=0\r\n\
s=-\r\n\
m=audio 1 RTP/SAVPF 111\r\n\
a=mid:audio\r\n\
a=ssrc:555 cname:local\r\n\
m=video 1 RTP/SAVPF 100\r\n\
a=mid:video\r\n\
a=ssrc:556 cname:local\r\n\
a=ssrc:600 cname:local\r\n\
a=ssrc:601 cname:local\r\n\
a=ssrc-group:FID 600 601\r\n";

  #[test]
  fn identical_snapshots_produce_no_diff() {
    let sdp = Sdp::parse(NEW);
    let differ = SdpDiffer::new(&sdp, &sdp);
    assert!(differ.new_media().is_empty());
    assert!(differ.to_contents(Creator::Responder).is_empty());
  }

  #[test]
  fn additions_and_removals_enumerate_the_symmetric_difference() {
    let old = Sdp::parse(OLD);
    let new = Sdp::parse(NEW);

    // What the new snapshot has that the old one lacks: the additions.
    let added = SdpDiffer::new(&old, &new).new_media();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].mid, "video");
    let ids: Vec<u32> = added[0].sources.iter().map(|source| source.id).collect();
    assert_eq!(ids, vec![600, 601]);
    assert_eq!(added[0].groups.len(), 1);
    assert_eq!(added[0].groups[0].sources, vec![600, 601]);

    // Nothing was removed going from old to new.
    assert!(SdpDiffer::new(&new, &old).new_media().is_empty());
  }

  #[test]
  fn group_membership_changes_are_detected() {
    let with_group = Sdp::parse(
      "v=0\r\nm=video 1 RTP/SAVPF 100\r\na=mid:video\r\na=ssrc-group:FID 1 2\r\n",
    );
    let reordered = Sdp::parse(
      "v=0\r\nm=video 1 RTP/SAVPF 100\r\na=mid:video\r\na=ssrc-group:FID 2 1\r\n",
    );
    let changed = Sdp::parse(
      "v=0\r\nm=video 1 RTP/SAVPF 100\r\na=mid:video\r\na=ssrc-group:FID 1 3\r\n",
    );

    // Same members in a different order is the same group.
    assert!(SdpDiffer::new(&with_group, &reordered).new_media().is_empty());
    assert_eq!(SdpDiffer::new(&with_group, &changed).new_media().len(), 1);
  }

  #[test]
  fn contents_carry_sources_and_groups() {
    let old = Sdp::parse(OLD);
    let new = Sdp::parse(NEW);
    let contents = SdpDiffer::new(&old, &new).to_contents(Creator::Responder);
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].name.0, "video");
    match contents[0].description.as_ref().unwrap() {
      jingle_xmpp_parsers::Description::Rtp(description) => {
        assert_eq!(description.ssrcs.len(), 2);
        assert_eq!(description.ssrc_groups.len(), 1);
      },
      other => panic!("unexpected description: {:?}", other),
    }
  }
}
