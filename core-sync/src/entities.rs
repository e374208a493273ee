//! Entity definitions wiring the catalog model types into the generic
//! repository. Each definition is pure conversion glue; the model shapes
//! themselves live in [`core_library::models`].

use crate::repository::{EntityDef, EntityRepository};
use core_library::models::{
    Album, AlbumPayload, AlbumView, Artist, ArtistPayload, ArtistView, EntityKind, Playlist,
    PlaylistPayload, PlaylistView, Track, TrackPayload, TrackView,
};

pub struct ArtistDef;

impl EntityDef for ArtistDef {
    const KIND: EntityKind = EntityKind::Artist;

    type Payload = ArtistPayload;
    type Record = Artist;
    type View = ArtistView;

    fn payload_id(payload: &Self::Payload) -> &str {
        &payload.id
    }

    fn payload_is_full(payload: &Self::Payload) -> bool {
        payload.is_full()
    }

    fn record_from_payload(payload: Self::Payload, previous: Option<Self::Record>) -> Self::Record {
        match previous {
            Some(previous) => Artist::merge_payload(payload, previous),
            None => payload.into(),
        }
    }

    fn view_of_record(record: &Self::Record) -> Self::View {
        record.to_view()
    }
}

pub struct AlbumDef;

impl EntityDef for AlbumDef {
    const KIND: EntityKind = EntityKind::Album;

    type Payload = AlbumPayload;
    type Record = Album;
    type View = AlbumView;

    fn payload_id(payload: &Self::Payload) -> &str {
        &payload.id
    }

    fn payload_is_full(payload: &Self::Payload) -> bool {
        payload.is_full()
    }

    fn record_from_payload(payload: Self::Payload, previous: Option<Self::Record>) -> Self::Record {
        match previous {
            Some(previous) => Album::merge_payload(payload, previous),
            None => payload.into(),
        }
    }

    fn view_of_record(record: &Self::Record) -> Self::View {
        record.to_view()
    }
}

pub struct TrackDef;

impl EntityDef for TrackDef {
    const KIND: EntityKind = EntityKind::Track;

    type Payload = TrackPayload;
    type Record = Track;
    type View = TrackView;

    fn payload_id(payload: &Self::Payload) -> &str {
        &payload.id
    }

    fn payload_is_full(payload: &Self::Payload) -> bool {
        payload.is_full()
    }

    fn record_from_payload(payload: Self::Payload, previous: Option<Self::Record>) -> Self::Record {
        match previous {
            Some(previous) => Track::merge_payload(payload, previous),
            None => payload.into(),
        }
    }

    fn view_of_record(record: &Self::Record) -> Self::View {
        record.to_view()
    }
}

pub struct PlaylistDef;

impl EntityDef for PlaylistDef {
    const KIND: EntityKind = EntityKind::Playlist;

    type Payload = PlaylistPayload;
    type Record = Playlist;
    type View = PlaylistView;

    fn payload_id(payload: &Self::Payload) -> &str {
        &payload.id
    }

    fn payload_is_full(payload: &Self::Payload) -> bool {
        payload.is_full()
    }

    fn record_from_payload(payload: Self::Payload, previous: Option<Self::Record>) -> Self::Record {
        match previous {
            Some(previous) => Playlist::merge_payload(payload, previous),
            None => payload.into(),
        }
    }

    fn view_of_record(record: &Self::Record) -> Self::View {
        record.to_view()
    }
}

pub type ArtistRepository = EntityRepository<ArtistDef>;
pub type AlbumRepository = EntityRepository<AlbumDef>;
pub type TrackRepository = EntityRepository<TrackDef>;
pub type PlaylistRepository = EntityRepository<PlaylistDef>;
