mod test_three_peers_join;
