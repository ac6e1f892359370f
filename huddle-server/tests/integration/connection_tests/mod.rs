mod test_rejoin_replaces_connection;
mod test_single_participant_joins_room;
